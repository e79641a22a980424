//! `navigator-config`: run configuration for the QA navigator.
//!
//! Provides:
//! - Typed config schema (llms, functions, workflow, output, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution for credentials
//! - Default value application
//! - Cross-reference validation
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_raw, parse_yaml, to_redacted_yaml};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    FunctionConfig, GeneralConfig, LlmConfig, LlmProviderType, NavigatorConfig, OutputConfig,
    WorkflowConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<NavigatorConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    finish(value)
}

/// Same pipeline as [`load_and_prepare`] over in-memory YAML and an explicit environment.
pub fn prepare_from_str(yaml: &str, env: &HashMap<String, String>) -> Result<NavigatorConfig> {
    let raw = parse_yaml(yaml)?;
    let value = resolve_env_vars_with(&raw, env)?;
    finish(value)
}

/// Load a config file with env vars resolved and defaults applied, without validating it.
pub async fn load_with_defaults(path: &Path) -> Result<NavigatorConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    typed(value)
}

fn typed(value: Value) -> Result<NavigatorConfig> {
    let config: NavigatorConfig =
        serde_json::from_value(value).context("Config does not match the expected schema")?;
    Ok(apply_all_defaults(config))
}

fn finish(value: Value) -> Result<NavigatorConfig> {
    let config = typed(value)?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", summary.join("\n  "));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use navigator_core::ToolKind;

    const SAMPLE: &str = r#"
general:
  log_level: debug
llms:
  openai_llm:
    _type: openai
    model_name: gpt-4o
    api_key: ${OPENAI_API_KEY}
    temperature: 0.0
functions:
  web_navigator:
    _type: web_navigator
    description: Fetches a page
  generate_test_automation_code:
    _type: generate_test_automation_code
    description: Writes Cypress code
    max_generations: 5
  generate_test_plan_markdown:
    _type: generate_test_plan_markdown
    description: Writes the plan
workflow:
  _type: react_agent
  llm_name: openai_llm
  tool_names: [web_navigator, generate_test_automation_code, generate_test_plan_markdown]
  max_iterations: 12
"#;

    fn env() -> HashMap<String, String> {
        HashMap::from([("OPENAI_API_KEY".to_string(), "sk-test".to_string())])
    }

    #[test]
    fn prepares_sample_config() {
        let cfg = prepare_from_str(SAMPLE, &env()).unwrap();
        assert_eq!(cfg.llms["openai_llm"].api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.workflow.max_iterations(), 12);
        assert_eq!(cfg.workflow.max_retries(), defaults::DEFAULT_MAX_RETRIES);
        assert_eq!(cfg.functions["generate_test_automation_code"].max_generations(), 5);
        assert_eq!(cfg.functions["web_navigator"].kind, ToolKind::WebNavigator);
        assert_eq!(
            cfg.functions["web_navigator"].llm_name.as_deref(),
            Some("openai_llm")
        );
        assert_eq!(cfg.output.extension(), ".cy.js");
    }

    #[test]
    fn missing_credential_fails() {
        let err = prepare_from_str(SAMPLE, &HashMap::new()).unwrap_err();
        assert!(format!("{err:#}").contains("OPENAI_API_KEY"));
    }

    #[test]
    fn invalid_reference_fails_validation() {
        let yaml = SAMPLE.replace("llm_name: openai_llm", "llm_name: other_llm");
        let err = prepare_from_str(&yaml, &env()).unwrap_err();
        assert!(err.to_string().contains("workflow.llm_name"));
    }

    #[test]
    fn unknown_tool_type_is_rejected() {
        let yaml = SAMPLE.replace("_type: generate_test_plan_markdown", "_type: send_email");
        assert!(prepare_from_str(&yaml, &env()).is_err());
    }

    #[test]
    fn redacted_yaml_hides_key() {
        let cfg = prepare_from_str(SAMPLE, &env()).unwrap();
        let yaml = to_redacted_yaml(&cfg).unwrap();
        assert!(!yaml.contains("sk-test"));
        assert!(yaml.contains("gpt-4o"));
    }
}
