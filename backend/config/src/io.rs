//! Config file reading.

use crate::redact::redact;
use crate::schema::NavigatorConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Environment variable naming the config file when `--config` is omitted.
pub const CONFIG_PATH_ENV: &str = "NAVIGATOR_CONFIG";

/// Default config location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yml";

/// Resolve the config path: explicit argument > `NAVIGATOR_CONFIG` > default.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Read the YAML document as an untyped JSON value tree.
pub async fn load_raw(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let value = parse_yaml(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Parse YAML text into a JSON value tree.
pub fn parse_yaml(raw: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(raw)?;
    let value = serde_json::to_value(yaml).context("Config is not representable as JSON")?;
    Ok(if value.is_null() { Value::Object(Default::default()) } else { value })
}

/// Serialize a config back to YAML with credentials masked.
pub fn to_redacted_yaml(config: &NavigatorConfig) -> Result<String> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    serde_yaml::to_string(&redact(&value)).context("Failed to serialize config to YAML")
}
