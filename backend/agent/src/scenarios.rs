//! End-to-end runs against a local site with scripted models.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use navigator_core::{Observation, ToolRegistry, ToolSpec};
use navigator_llm::{LlmClient, MockProvider};
use navigator_tools::{
    CodeGenOptions, CodeGeneratorTool, NavigatorOptions, PlanWriterTool, TestCaseSynthesizer,
    WebNavigatorTool,
};

use crate::agent_loop::{AgentRunner, AgentSettings, RunContext};

const SITE: &str = r#"<!doctype html>
<html><head><title>Example Domain</title></head>
<body><div><h1>Example Domain</h1>
<p>This domain is for use in illustrative examples in documents.</p>
<p><a href="/more-info">More information...</a></p>
</div></body></html>"#;

const SCRIPT: &str = "```javascript\ndescribe('Example Domain', () => {\n  it('shows the heading', () => {\n    cy.visit('/');\n    cy.get('h1').should('contain', 'Example Domain');\n  });\n});\n```";

#[tokio::test]
async fn single_link_site_yields_script_and_plan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SITE))
        .mount(&server)
        .await;
    let site = format!("{}/", server.uri());
    let out = tempfile::tempdir().unwrap();

    // Tools share one model: first the synthesizer, then the code generator.
    let tool_llm = LlmClient::new(
        Arc::new(MockProvider::new("tools").with_script([
            "1. Verify the Example Domain heading is displayed\n2. Follow the More information link",
            SCRIPT,
        ])),
        "gpt-4o",
    );

    let navigator = WebNavigatorTool::new(NavigatorOptions::default())
        .unwrap()
        .with_synthesizer(TestCaseSynthesizer::new(tool_llm.clone(), 10));
    let code_gen = CodeGeneratorTool::new(
        tool_llm,
        CodeGenOptions {
            framework: "Cypress JS".into(),
            extension: ".cy.js".into(),
            output_dir: out.path().to_path_buf(),
            max_generations: 10,
        },
    );
    let mut registry = ToolRegistry::new();
    for spec in [
        ToolSpec::new("web_navigator", "Opens a page.", Arc::new(navigator)),
        ToolSpec::new("generate_test_automation_code", "Writes a script.", Arc::new(code_gen)),
        ToolSpec::new("generate_test_plan_markdown", "Writes a plan.", Arc::new(PlanWriterTool::new(out.path()))),
    ] {
        registry.register(spec).unwrap();
    }

    let agent_llm = Arc::new(MockProvider::new("agent").with_script([
        format!("Thought: I should look at the site first.\nAction: web_navigator\nAction Input: {{\"url\": \"{site}\"}}"),
        format!(
            "Thought: Write the heading test.\nAction: generate_test_automation_code\nAction Input: \
             {{\"test_case\": \"Verify the Example Domain heading is displayed\", \"start_page_url\": \"{site}\", \
             \"relevant_html_content_to_test\": \"<h1>Example Domain</h1>\"}}"
        ),
        format!(
            "Thought: Now the plan.\nAction: generate_test_plan_markdown\nAction Input: \
             {{\"test_name\": \"Example Domain\", \"application_url\": \"{site}\", \
             \"test_cases\": [\"Verify the Example Domain heading is displayed\", \"Follow the More information link\"]}}"
        ),
        "Thought: I now know the final answer\nFinal Answer: 1 test script and 1 test plan generated".to_string(),
    ]));

    let ctx = RunContext::new(
        Arc::new(registry),
        LlmClient::new(agent_llm, "gpt-4o"),
        AgentSettings {
            retry_backoff: std::time::Duration::ZERO,
            ..AgentSettings::default()
        },
    );
    let outcome = AgentRunner::new(ctx).run(&format!("Test the site at {site}")).await.unwrap();

    assert_eq!(outcome.iterations, 4);
    assert_eq!(outcome.final_answer, "1 test script and 1 test plan generated");

    let Observation::Ok { content } = &outcome.steps[0].observation else {
        panic!("navigation failed: {:?}", outcome.steps[0].observation);
    };
    let page: serde_json::Value = serde_json::from_str(content).unwrap();
    assert_eq!(page["urls"], serde_json::json!([format!("{}/more-info", server.uri())]));
    assert!(!page["tests"].as_array().unwrap().is_empty());

    let script = out.path().join("verify_the_example_domain_heading_is_dis.cy.js");
    assert!(std::fs::read_to_string(&script).unwrap().contains("cy.visit('/')"));

    let plan = std::fs::read_to_string(out.path().join("example_domain.md")).unwrap();
    assert!(plan.contains(&site));
    assert!(plan.contains("| TC-002 | Follow the More information link |"));
}
