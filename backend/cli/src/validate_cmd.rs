//! `navigator validate`: report config problems and show the effective config.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use navigator_config::{config_file_path, load_with_defaults, to_redacted_yaml, validate};

use crate::terminal_output::{note_error, note_success, note_warn};

pub async fn run(config: Option<&Path>) -> Result<ExitCode> {
    let path = config_file_path(config);
    let config = load_with_defaults(&path).await?;
    crate::init_logging(&config);

    let report = validate(&config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    print!("{}", to_redacted_yaml(&config)?);

    if report.is_valid() {
        note_success(&format!(
            "{} is valid ({} warnings)",
            path.display(),
            report.warnings.len()
        ));
        Ok(ExitCode::SUCCESS)
    } else {
        note_error(&format!("{} has {} errors", path.display(), report.errors.len()));
        Ok(ExitCode::FAILURE)
    }
}
