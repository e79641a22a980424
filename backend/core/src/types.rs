use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A test case discovered while exploring the target site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub start_page_url: String,
    #[serde(default)]
    pub relevant_html_snippet: String,
}

/// The terminal artifact aggregating all test cases of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlan {
    pub name: String,
    pub application_url: String,
    pub test_cases: Vec<TestCase>,
    pub generated_at: DateTime<Utc>,
}

/// One think/act/observe iteration. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub index: usize,
    pub thought: String,
    pub action: Option<String>,
    pub action_input: Option<serde_json::Value>,
    pub observation: Observation,
}

/// Result of an action as seen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Observation {
    Ok { content: String },
    Error { error: ErrorReport },
    /// The step carried the final answer instead of an action.
    Final { answer: String },
}

impl Observation {
    pub fn is_error(&self) -> bool {
        matches!(self, Observation::Error { .. })
    }

    /// Text appended to the conversation after `Observation:`.
    pub fn render(&self) -> String {
        match self {
            Observation::Ok { content } => content.clone(),
            Observation::Error { error } => {
                serde_json::json!({ "error": error.message, "kind": error.kind }).to_string()
            }
            Observation::Final { answer } => answer.clone(),
        }
    }
}

/// Structured output of the web navigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: String,
    pub status: u16,
    pub title: Option<String>,
    pub links: Vec<String>,
    pub extracted_text: String,
    #[serde(default)]
    pub raw_html: String,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// Source text produced by the code generator together with where it landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub test_case: String,
    pub source: String,
    pub test_file_path: String,
}

/// Location of a written test plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanArtifact {
    pub file_path: String,
    pub test_case_count: usize,
}
