//! Config validation: cross-reference and range checks with field paths.

use crate::schema::{LlmProviderType, NavigatorConfig};
use navigator_core::ToolKind;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &NavigatorConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_llms(config, &mut report);
    validate_functions(config, &mut report);
    validate_workflow(config, &mut report);
    report
}

fn validate_llms(config: &NavigatorConfig, report: &mut ValidationReport) {
    for (name, llm) in &config.llms {
        let path = format!("llms.{name}");
        if llm.model_name.trim().is_empty() && llm.provider != LlmProviderType::Mock {
            report.error(format!("{path}.model_name"), "model_name cannot be empty");
        }
        if llm.provider == LlmProviderType::Openai
            && llm.api_key.as_deref().map(str::is_empty).unwrap_or(true)
        {
            report.warn(format!("{path}.api_key"), "No API key set; requests will be unauthenticated");
        }
        if let Some(t) = llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                report.error(format!("{path}.temperature"), "temperature must be within 0.0..=2.0");
            }
        }
        if llm.provider == LlmProviderType::Mock && llm.responses.is_empty() {
            report.warn(format!("{path}.responses"), "Mock provider has no scripted responses");
        }
    }
}

fn validate_functions(config: &NavigatorConfig, report: &mut ValidationReport) {
    for (name, function) in &config.functions {
        let path = format!("functions.{name}");
        if let Some(llm) = &function.llm_name {
            if !config.llms.contains_key(llm) {
                report.error(format!("{path}.llm_name"), format!("Unknown llm '{llm}'"));
            }
        } else if function.kind != ToolKind::GenerateTestPlanMarkdown {
            report.error(format!("{path}.llm_name"), "This tool needs an llm_name");
        }
        if function.timeout_secs == Some(0) {
            report.error(format!("{path}.timeout_secs"), "timeout_secs must be >= 1");
        }
        if function.max_generations == Some(0) {
            report.warn(
                format!("{path}.max_generations"),
                "max_generations is 0; every code generation request will be refused",
            );
        }
        if let Some(schemes) = &function.allowed_schemes {
            if schemes.is_empty() {
                report.error(format!("{path}.allowed_schemes"), "At least one scheme is required");
            }
        }
    }
}

fn validate_workflow(config: &NavigatorConfig, report: &mut ValidationReport) {
    let wf = &config.workflow;
    if wf.llm_name.trim().is_empty() {
        report.error("workflow.llm_name", "workflow.llm_name is required");
    } else if !config.llms.contains_key(&wf.llm_name) {
        report.error("workflow.llm_name", format!("Unknown llm '{}'", wf.llm_name));
    }

    if wf.tool_names.is_empty() {
        report.error("workflow.tool_names", "The agent needs at least one tool");
    }
    for (i, tool) in wf.tool_names.iter().enumerate() {
        if !config.functions.contains_key(tool) {
            report.error(
                format!("workflow.tool_names[{i}]"),
                format!("No function named '{tool}'"),
            );
        }
    }

    if wf.max_iterations == Some(0) {
        report.error("workflow.max_iterations", "max_iterations must be > 0");
    }
    match wf.max_history {
        Some(0) => report.error("workflow.max_history", "max_history must be > 0"),
        Some(n) if n < 3 => report.warn(
            "workflow.max_history",
            "max_history below 3 leaves no room for the task and an observation",
        ),
        _ => {}
    }
    if wf
        .stopping_condition
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(false)
    {
        report.error("workflow.stopping_condition", "stopping_condition cannot be empty");
    }
    if let Some(prompt) = &wf.system_prompt {
        if !prompt.contains("{tools}") && !prompt.contains("{tool_names}") {
            report.warn(
                "workflow.system_prompt",
                "Prompt template does not reference {tools} or {tool_names}",
            );
        }
    }
}
