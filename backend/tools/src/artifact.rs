//! Artifact files: slugged names and atomic writes.

use std::path::{Path, PathBuf};

use tokio::fs;

use navigator_core::{NavigatorError, Result};

/// Lowercase ASCII slug: runs of non-alphanumerics collapse to `_`, edges trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// File name `<slug[..max_len]><ext>`, with `fallback` for text that has no usable characters.
pub fn artifact_name(text: &str, max_len: usize, fallback: &str, ext: &str) -> String {
    let mut slug = slugify(text);
    slug.truncate(max_len);
    let slug = slug.trim_end_matches('_');
    let stem = if slug.is_empty() { fallback } else { slug };
    format!("{stem}{ext}")
}

/// Writes `contents` to `path` through a sibling temp file and a rename,
/// so readers never observe a partial file.
pub async fn atomic_write(path: &Path, contents: &str) -> Result<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|e| NavigatorError::write_failure(parent, e))?;

    if path.file_name().is_none() {
        return Err(NavigatorError::write_failure(path, "path has no file name"));
    }
    // Independent of the target name so it never exceeds the name limit first.
    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

    if let Err(e) = fs::write(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(NavigatorError::write_failure(path, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(NavigatorError::write_failure(path, e));
    }
    Ok(path.to_path_buf())
}
