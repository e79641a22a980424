//! Config defaults: applies default values to a parsed config.

use crate::schema::{FunctionConfig, NavigatorConfig};
use navigator_core::ToolKind;

pub const DEFAULT_MAX_ITERATIONS: usize = 25;
pub const DEFAULT_MAX_HISTORY: usize = 30;
pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_STOPPING_CONDITION: &str = "Final Answer:";
pub const DEFAULT_MAX_OBSERVATION_CHARS: usize = 12_000;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2_000_000;
pub const DEFAULT_MAX_TEST_CASES: usize = 20;
pub const DEFAULT_MAX_GENERATIONS: usize = 10;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_FRAMEWORK: &str = "Cypress JS";
pub const DEFAULT_CODE_EXTENSION: &str = ".cy.js";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: NavigatorConfig) -> NavigatorConfig {
    let config = apply_workflow_defaults(config);
    let config = apply_function_defaults(config);
    let config = apply_output_defaults(config);
    apply_logging_defaults(config)
}

/// Pin the loop limits so the effective values show up in `validate` output.
fn apply_workflow_defaults(mut config: NavigatorConfig) -> NavigatorConfig {
    let wf = &mut config.workflow;
    wf.kind.get_or_insert_with(|| "react_agent".to_string());
    wf.max_iterations.get_or_insert(DEFAULT_MAX_ITERATIONS);
    wf.max_history.get_or_insert(DEFAULT_MAX_HISTORY);
    wf.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
    wf.stopping_condition
        .get_or_insert_with(|| DEFAULT_STOPPING_CONDITION.to_string());
    wf.max_observation_chars
        .get_or_insert(DEFAULT_MAX_OBSERVATION_CHARS);

    // A workflow that names no tools gets every configured function.
    if wf.tool_names.is_empty() {
        wf.tool_names = config.functions.keys().cloned().collect();
    }
    config
}

/// Tools without an explicit `llm_name` share the workflow's model.
fn apply_function_defaults(mut config: NavigatorConfig) -> NavigatorConfig {
    let workflow_llm = config.workflow.llm_name.clone();
    for function in config.functions.values_mut() {
        apply_kind_defaults(function);
        if function.llm_name.is_none() && !workflow_llm.is_empty() {
            function.llm_name = Some(workflow_llm.clone());
        }
    }
    config
}

fn apply_kind_defaults(function: &mut FunctionConfig) {
    match function.kind {
        ToolKind::WebNavigator => {
            function.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
            function
                .allowed_schemes
                .get_or_insert_with(|| vec!["http".to_string(), "https".to_string()]);
            function.synthesize_tests.get_or_insert(true);
        }
        ToolKind::GenerateTestAutomationCode => {
            function.max_generations.get_or_insert(DEFAULT_MAX_GENERATIONS);
        }
        ToolKind::GenerateTestPlanMarkdown => {}
    }
}

fn apply_output_defaults(mut config: NavigatorConfig) -> NavigatorConfig {
    let output = &mut config.output;
    output.dir.get_or_insert_with(|| DEFAULT_OUTPUT_DIR.to_string());
    output
        .framework
        .get_or_insert_with(|| DEFAULT_FRAMEWORK.to_string());
    output
        .extension
        .get_or_insert_with(|| DEFAULT_CODE_EXTENSION.to_string());
    config
}

fn apply_logging_defaults(mut config: NavigatorConfig) -> NavigatorConfig {
    config
        .general
        .log_level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WorkflowConfig;

    #[test]
    fn applies_loop_limits() {
        let cfg = apply_all_defaults(NavigatorConfig::default());
        assert_eq!(cfg.workflow.max_iterations, Some(DEFAULT_MAX_ITERATIONS));
        assert_eq!(cfg.workflow.max_retries, Some(DEFAULT_MAX_RETRIES));
        assert_eq!(cfg.workflow.stopping_condition.as_deref(), Some("Final Answer:"));
    }

    #[test]
    fn does_not_override_user_limits() {
        let cfg = NavigatorConfig {
            workflow: WorkflowConfig {
                max_iterations: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.workflow.max_iterations, Some(3));
    }

    #[test]
    fn tools_inherit_workflow_llm_and_fill_tool_names() {
        let mut cfg = NavigatorConfig::default();
        cfg.workflow.llm_name = "main".into();
        cfg.functions
            .insert("web_navigator".into(), FunctionConfig::new(ToolKind::WebNavigator));
        let cfg = apply_all_defaults(cfg);
        let nav = &cfg.functions["web_navigator"];
        assert_eq!(nav.llm_name.as_deref(), Some("main"));
        assert_eq!(nav.synthesize_tests, Some(true));
        assert_eq!(cfg.workflow.tool_names, vec!["web_navigator".to_string()]);
    }
}
