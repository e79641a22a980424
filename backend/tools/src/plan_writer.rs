//! Markdown test plan documents.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use navigator_core::{
    NavigatorError, PlanArtifact, PlanInput, Result, TestPlan, Tool, ToolInput, ToolKind,
    ToolOutput,
};
use navigator_markdown::{MarkdownTable, Renderer};

use crate::artifact::{artifact_name, atomic_write};
use crate::mismatched_input;

/// Longest slug used for a plan file name.
pub const MAX_PLAN_SLUG_LEN: usize = 100;

/// Prefix of the only line that changes between renders of the same plan.
pub const GENERATED_AT_PREFIX: &str = "- **Generated at:** ";

pub struct PlanWriterTool {
    output_dir: PathBuf,
}

impl PlanWriterTool {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes the plan to `<output_dir>/<slug(test_name)[..100]>.md`, replacing any earlier version.
    pub async fn write(&self, input: PlanInput) -> Result<PlanArtifact> {
        if input.test_cases.is_empty() {
            return Err(NavigatorError::EmptyPlan);
        }

        let plan = TestPlan {
            name: input.test_name,
            application_url: input.application_url,
            test_cases: input.test_cases,
            generated_at: Utc::now(),
        };
        let path = self
            .output_dir
            .join(artifact_name(&plan.name, MAX_PLAN_SLUG_LEN, "test_plan", ".md"));
        let path = atomic_write(&path, &render_plan(&plan)).await?;
        info!(path = %path.display(), cases = plan.test_cases.len(), "Test plan written");

        Ok(PlanArtifact {
            file_path: path.display().to_string(),
            test_case_count: plan.test_cases.len(),
        })
    }
}

/// Renders the plan document. Output depends only on `plan`.
pub fn render_plan(plan: &TestPlan) -> String {
    let app_url = if plan.application_url.is_empty() {
        "(not specified)"
    } else {
        plan.application_url.as_str()
    };

    let mut doc = Renderer::heading(1, &format!("Test Plan: {}", plan.name));
    doc.push('\n');
    doc.push_str(&format!("- **Application URL:** {app_url}\n"));
    doc.push_str(&format!("{GENERATED_AT_PREFIX}{}\n", plan.generated_at.to_rfc3339()));
    doc.push_str(&format!("- **Test cases:** {}\n\n", plan.test_cases.len()));

    doc.push_str(&Renderer::heading(2, "Summary"));
    doc.push('\n');
    let mut table = MarkdownTable::new(["ID", "Description", "Start page"]);
    for case in &plan.test_cases {
        let start = if case.start_page_url.is_empty() { app_url } else { case.start_page_url.as_str() };
        table.row([case.id.as_str(), case.description.as_str(), start]);
    }
    doc.push_str(&table.render());

    doc.push('\n');
    doc.push_str(&Renderer::heading(2, "Test Cases"));
    for case in &plan.test_cases {
        doc.push('\n');
        doc.push_str(&Renderer::heading(3, &format!("{}: {}", case.id, case.description)));
        doc.push('\n');
        let start = if case.start_page_url.is_empty() { app_url } else { case.start_page_url.as_str() };
        doc.push_str(&format!("- **Start page:** {start}\n"));
        doc.push_str(&format!("- **Objective:** {}\n", case.description.trim()));
        if !case.relevant_html_snippet.trim().is_empty() {
            doc.push_str("- **Relevant page content:**\n\n");
            doc.push_str(&Renderer::fenced("text", &case.relevant_html_snippet));
        }
    }
    doc
}

#[async_trait]
impl Tool for PlanWriterTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GenerateTestPlanMarkdown
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput> {
        match input {
            ToolInput::GenerateTestPlanMarkdown(input) => Ok(ToolOutput::Plan(self.write(input).await?)),
            other => Err(mismatched_input(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use navigator_core::{ErrorKind, TestCase};

    fn case(id: &str, description: &str) -> TestCase {
        TestCase {
            id: id.into(),
            description: description.into(),
            start_page_url: "https://example.com/".into(),
            relevant_html_snippet: String::new(),
        }
    }

    fn plan_input(cases: Vec<TestCase>) -> PlanInput {
        PlanInput {
            test_name: "Example Domain Smoke".into(),
            application_url: "https://example.com/".into(),
            test_cases: cases,
        }
    }

    #[tokio::test]
    async fn empty_plan_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = PlanWriterTool::new(&out).write(plan_input(vec![])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyPlan);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn writes_slugged_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = PlanWriterTool::new(dir.path())
            .write(plan_input(vec![case("TC-001", "Verify the heading")]))
            .await
            .unwrap();

        let path = dir.path().join("example_domain_smoke.md");
        assert_eq!(artifact.file_path, path.display().to_string());
        assert_eq!(artifact.test_case_count, 1);

        let doc = std::fs::read_to_string(path).unwrap();
        assert!(doc.starts_with("# Test Plan: Example Domain Smoke\n"));
        assert!(doc.contains("| TC-001 | Verify the heading | https://example.com/ |"));
        assert!(doc.contains("### TC-001: Verify the heading"));
    }

    #[tokio::test]
    async fn long_test_name_gets_a_short_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = "Comprehensive regression plan ".repeat(8);
        assert_eq!(name.len(), 240);
        let input = PlanInput { test_name: name.clone(), ..plan_input(vec![case("TC-001", "Check title")]) };

        let artifact = PlanWriterTool::new(dir.path()).write(input).await.unwrap();

        let path = std::path::Path::new(&artifact.file_path);
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("comprehensive_regression_plan_"));
        assert!(file_name.len() <= MAX_PLAN_SLUG_LEN + ".md".len());
        let doc = std::fs::read_to_string(path).unwrap();
        assert!(doc.starts_with(&format!("# Test Plan: {}", name.trim_end())));
    }

    #[tokio::test]
    async fn string_cases_from_model_input() {
        let dir = tempfile::tempdir().unwrap();
        let raw = r#"{"test_name": "Home", "application_url": "https://example.com/",
                      "test_cases": ["Check title", "Follow the More information link"]}"#;
        let input = ToolKind::GenerateTestPlanMarkdown.parse_input(raw).unwrap();

        let ToolOutput::Plan(artifact) = PlanWriterTool::new(dir.path()).invoke(input).await.unwrap()
        else {
            panic!("expected a plan artifact");
        };
        assert_eq!(artifact.test_case_count, 2);
        let doc = std::fs::read_to_string(&artifact.file_path).unwrap();
        assert!(doc.contains("| TC-002 | Follow the More information link | https://example.com/ |"));
    }

    #[test]
    fn rendering_is_stable_apart_from_timestamp() {
        let mut plan = TestPlan {
            name: "Login".into(),
            application_url: "https://example.com/".into(),
            test_cases: vec![case("TC-001", "Valid login | remember me"), case("TC-002", "Bad password")],
            generated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let first = render_plan(&plan);
        assert_eq!(first, render_plan(&plan));

        plan.generated_at = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let second = render_plan(&plan);
        let differing: Vec<_> = first
            .lines()
            .zip(second.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with(GENERATED_AT_PREFIX));
        assert!(first.contains("Valid login \\| remember me"));
    }
}
