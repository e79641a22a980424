//! Builds the tool registry for a run from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use navigator_config::{FunctionConfig, NavigatorConfig};
use navigator_core::{Tool, ToolKind, ToolRegistry, ToolSpec};
use navigator_llm::{LlmClient, ProviderRegistry};

use crate::code_gen::{CodeGenOptions, CodeGeneratorTool};
use crate::plan_writer::PlanWriterTool;
use crate::synthesizer::TestCaseSynthesizer;
use crate::web::{NavigatorOptions, WebNavigatorTool};

pub fn default_description(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::WebNavigator => {
            "Fetches and analyzes a webpage, returning the page title, a summary of its \
             interactive elements, the absolute URLs it links to and candidate test cases. \
             Input: the URL to open."
        }
        ToolKind::GenerateTestAutomationCode => {
            "Generates a test automation script for one test case and saves it to the output \
             directory. Input: JSON with 'test_case', 'start_page_url' and \
             'relevant_html_content_to_test'."
        }
        ToolKind::GenerateTestPlanMarkdown => {
            "Writes a markdown test plan. Input: JSON with 'test_name', 'application_url' and \
             'test_cases' (a list of descriptions or objects). Output: path to the file."
        }
    }
}

/// One registry per run: tools hold per-run state such as the generation count.
pub fn build_registry(
    config: &NavigatorConfig,
    llms: &ProviderRegistry,
    output_dir: &Path,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for name in &config.workflow.tool_names {
        let function = config
            .functions
            .get(name)
            .with_context(|| format!("Tool '{name}' is not defined under functions"))?;
        let handle = build_tool(name, function, config, llms, output_dir)?;
        let description = function
            .description
            .clone()
            .unwrap_or_else(|| default_description(function.kind).to_string());
        registry.register(ToolSpec::new(name.clone(), description, handle))?;
        debug!(tool = %name, kind = %function.kind, "Tool registered");
    }
    Ok(registry)
}

fn build_tool(
    name: &str,
    function: &FunctionConfig,
    config: &NavigatorConfig,
    llms: &ProviderRegistry,
    output_dir: &Path,
) -> Result<Arc<dyn Tool>> {
    let llm = |required: bool| -> Result<Option<LlmClient>> {
        match function.llm_name.as_deref() {
            Some(llm_name) => match llms.get(llm_name) {
                Some(client) => Ok(Some(client)),
                None => bail!("Tool '{name}' references unknown LLM '{llm_name}'"),
            },
            None if required => bail!("Tool '{name}' requires an llm_name"),
            None => Ok(None),
        }
    };

    let tool: Arc<dyn Tool> = match function.kind {
        ToolKind::WebNavigator => {
            let mut tool = WebNavigatorTool::new(NavigatorOptions::from_config(function))?;
            if function.synthesize_tests.unwrap_or(true) {
                if let Some(client) = llm(false)? {
                    tool = tool.with_synthesizer(TestCaseSynthesizer::new(
                        client,
                        function.max_test_cases(),
                    ));
                }
            }
            Arc::new(tool)
        }
        ToolKind::GenerateTestAutomationCode => {
            let client = llm(true)?.with_context(|| format!("Tool '{name}' has no LLM"))?;
            Arc::new(CodeGeneratorTool::new(
                client,
                CodeGenOptions {
                    framework: config.output.framework().to_string(),
                    extension: config.output.extension().to_string(),
                    output_dir: output_dir.to_path_buf(),
                    max_generations: function.max_generations(),
                },
            ))
        }
        ToolKind::GenerateTestPlanMarkdown => Arc::new(PlanWriterTool::new(output_dir)),
    };
    Ok(tool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONFIG: &str = r#"
llms:
  openai_llm:
    _type: mock
    model_name: scripted
    responses: ["Final Answer: done"]
functions:
  web_navigator:
    _type: web_navigator
  generate_test_automation_code:
    _type: generate_test_automation_code
  generate_test_plan_markdown:
    _type: generate_test_plan_markdown
workflow:
  _type: react_agent
  llm_name: openai_llm
  tool_names: [web_navigator, generate_test_automation_code, generate_test_plan_markdown]
"#;

    #[test]
    fn registry_follows_workflow_order() {
        let config = navigator_config::prepare_from_str(CONFIG, &HashMap::new()).unwrap();
        let llms = ProviderRegistry::from_config(&config.llms).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let registry = build_registry(&config, &llms, dir.path()).unwrap();
        assert_eq!(
            registry.list(),
            vec![
                "web_navigator",
                "generate_test_automation_code",
                "generate_test_plan_markdown"
            ]
        );
        let spec = registry.get("web_navigator").unwrap();
        assert_eq!(spec.kind, ToolKind::WebNavigator);
        assert!(spec.description.contains("webpage"));
    }

    #[test]
    fn unknown_llm_is_rejected() {
        let mut config = navigator_config::prepare_from_str(CONFIG, &HashMap::new()).unwrap();
        if let Some(f) = config.functions.get_mut("generate_test_automation_code") {
            f.llm_name = Some("missing".into());
        }
        let llms = ProviderRegistry::from_config(&config.llms).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = build_registry(&config, &llms, dir.path()).unwrap_err();
        assert!(err.to_string().contains("unknown LLM 'missing'"));
    }
}
