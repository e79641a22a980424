use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{NavigatorError, Result};
use crate::traits::Tool;
use crate::types::{GeneratedCode, PageAnalysis, PlanArtifact, TestCase};

/// Characters of raw HTML echoed back to the model in a navigator observation.
pub const OBSERVATION_HTML_EXCERPT: usize = 4_000;

static URL_IN_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s"'<>`]+"#).unwrap());

/// Finds the first http(s) URL in free text, without trailing punctuation.
pub fn find_url(text: &str) -> Option<&str> {
    URL_IN_TEXT
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')', ']', '}', '!', '?']))
}

/// The implementation a registered tool name is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebNavigator,
    GenerateTestAutomationCode,
    GenerateTestPlanMarkdown,
}

/// Validated payload for a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "input", rename_all = "snake_case")]
pub enum ToolInput {
    WebNavigator(NavigateInput),
    GenerateTestAutomationCode(CodeGenInput),
    GenerateTestPlanMarkdown(PlanInput),
}

impl ToolInput {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInput::WebNavigator(_) => ToolKind::WebNavigator,
            ToolInput::GenerateTestAutomationCode(_) => ToolKind::GenerateTestAutomationCode,
            ToolInput::GenerateTestPlanMarkdown(_) => ToolKind::GenerateTestPlanMarkdown,
        }
    }

    /// JSON view of the payload, recorded on the agent step.
    pub fn to_value(&self) -> Value {
        match self {
            ToolInput::WebNavigator(input) => serde_json::to_value(input),
            ToolInput::GenerateTestAutomationCode(input) => serde_json::to_value(input),
            ToolInput::GenerateTestPlanMarkdown(input) => serde_json::to_value(input),
        }
        .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateInput {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenInput {
    pub test_case: String,
    pub start_page_url: String,
    pub relevant_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInput {
    pub test_name: String,
    pub application_url: String,
    pub test_cases: Vec<TestCase>,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::WebNavigator => "web_navigator",
            ToolKind::GenerateTestAutomationCode => "generate_test_automation_code",
            ToolKind::GenerateTestPlanMarkdown => "generate_test_plan_markdown",
        }
    }

    /// JSON Schema advertised to the model for this kind.
    pub fn input_schema(self) -> Value {
        match self {
            ToolKind::WebNavigator => json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute http(s) URL of the page to analyze" }
                },
                "required": ["url"]
            }),
            ToolKind::GenerateTestAutomationCode => json!({
                "type": "object",
                "properties": {
                    "test_case": { "type": "string" },
                    "start_page_url": { "type": "string" },
                    "relevant_html": { "type": "string" }
                },
                "required": ["test_case", "start_page_url", "relevant_html"]
            }),
            ToolKind::GenerateTestPlanMarkdown => json!({
                "type": "object",
                "properties": {
                    "test_name": { "type": "string" },
                    "application_url": { "type": "string" },
                    "test_cases": {
                        "type": "array",
                        "items": {
                            "oneOf": [
                                { "type": "string" },
                                {
                                    "type": "object",
                                    "properties": {
                                        "id": { "type": "string" },
                                        "description": { "type": "string" },
                                        "start_page_url": { "type": "string" },
                                        "relevant_html_snippet": { "type": "string" }
                                    },
                                    "required": ["description"]
                                }
                            ]
                        }
                    }
                },
                "required": ["test_name", "application_url", "test_cases"]
            }),
        }
    }

    /// Parses the model's raw `Action Input` text into a validated payload.
    ///
    /// Malformed JSON is a `ParseError`; well-formed payloads lacking a
    /// required field are a `MissingField`.
    pub fn parse_input(self, raw: &str) -> Result<ToolInput> {
        match self {
            ToolKind::WebNavigator => parse_navigate(raw).map(ToolInput::WebNavigator),
            ToolKind::GenerateTestAutomationCode => {
                parse_code_gen(raw).map(ToolInput::GenerateTestAutomationCode)
            }
            ToolKind::GenerateTestPlanMarkdown => {
                parse_plan(raw).map(ToolInput::GenerateTestPlanMarkdown)
            }
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient JSON decoding for model-authored payloads.
pub fn loose_json(raw: &str) -> Option<Value> {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(v);
            }
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end].replace('\'', "\"")) {
                return Some(v);
            }
        }
    }
    None
}

/// Unwraps the `{"query": ...}` envelope some agent frameworks put around inputs.
fn unwrap_query(value: Value) -> Value {
    let mut map = match value {
        Value::Object(map) => map,
        other => return other,
    };
    if map.len() == 1 {
        if let Some(inner) = map.remove("query") {
            return match inner {
                Value::String(s) => loose_json(&s).unwrap_or(Value::String(s)),
                other => other,
            };
        }
    }
    Value::Object(map)
}

fn get_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn require_object(kind: ToolKind, raw: &str) -> Result<Map<String, Value>> {
    match loose_json(raw).map(unwrap_query) {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(NavigatorError::ParseError(format!(
            "Action Input for {kind} must be a JSON object"
        ))),
    }
}

fn parse_navigate(raw: &str) -> Result<NavigateInput> {
    let candidate = match loose_json(raw).map(unwrap_query) {
        Some(Value::Object(map)) => get_str(&map, &["url", "query", "start_page_url"]).map(str::to_string),
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
    .unwrap_or_else(|| raw.trim().trim_matches(['"', '\'']).to_string());

    let url = find_url(&candidate).unwrap_or(candidate.trim()).to_string();
    if url.is_empty() {
        return Err(NavigatorError::MissingField("url".into()));
    }
    Ok(NavigateInput { url })
}

fn parse_code_gen(raw: &str) -> Result<CodeGenInput> {
    let map = require_object(ToolKind::GenerateTestAutomationCode, raw)?;
    let field = |name: &str, keys: &[&str]| {
        get_str(&map, keys)
            .map(str::to_string)
            .ok_or_else(|| NavigatorError::MissingField(name.to_string()))
    };
    Ok(CodeGenInput {
        test_case: field("test_case", &["test_case", "description"])?,
        start_page_url: field("start_page_url", &["start_page_url", "url"])?,
        relevant_html: field(
            "relevant_html",
            &["relevant_html", "relevant_html_content_to_test", "relevant_html_snippet"],
        )?,
    })
}

fn parse_plan(raw: &str) -> Result<PlanInput> {
    let map = require_object(ToolKind::GenerateTestPlanMarkdown, raw)?;
    let test_name = get_str(&map, &["test_name", "name"])
        .unwrap_or("Untitled Test Plan")
        .to_string();
    let application_url = get_str(&map, &["application_url", "url"])
        .unwrap_or_default()
        .to_string();

    let entries = match map.get("test_cases") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => match loose_json(s) {
            Some(Value::Array(items)) => items,
            _ => s.lines().map(|l| Value::String(l.to_string())).collect(),
        },
        Some(_) => {
            return Err(NavigatorError::ParseError(
                "'test_cases' must be an array".into(),
            ))
        }
        None => Vec::new(),
    };

    let mut test_cases = Vec::with_capacity(entries.len());
    for entry in entries {
        let (id, description, start_page_url, snippet) = match &entry {
            Value::String(s) => (None, s.trim().to_string(), None, String::new()),
            Value::Object(obj) => (
                get_str(obj, &["id", "test_id"]).map(str::to_string),
                get_str(obj, &["description", "test_case", "name", "title"])
                    .unwrap_or_default()
                    .to_string(),
                get_str(obj, &["start_page_url", "url"]).map(str::to_string),
                get_str(obj, &["relevant_html_snippet", "relevant_html"])
                    .unwrap_or_default()
                    .to_string(),
            ),
            _ => continue,
        };
        if description.is_empty() {
            continue;
        }
        test_cases.push(TestCase {
            id: id.unwrap_or_else(|| format!("TC-{:03}", test_cases.len() + 1)),
            description,
            start_page_url: start_page_url.unwrap_or_else(|| application_url.clone()),
            relevant_html_snippet: snippet,
        });
    }

    Ok(PlanInput { test_name, application_url, test_cases })
}

/// Output of a successful tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    Page(PageAnalysis),
    Code(GeneratedCode),
    Plan(PlanArtifact),
}

impl ToolOutput {
    /// Text handed back to the model as the observation.
    pub fn observation(&self) -> String {
        let value = match self {
            ToolOutput::Page(page) => {
                let excerpt: String = page.raw_html.chars().take(OBSERVATION_HTML_EXCERPT).collect();
                json!({
                    "url": page.url,
                    "title": page.title,
                    "urls": page.links,
                    "summary": page.extracted_text,
                    "tests": page.tests,
                    "html_excerpt": excerpt,
                })
            }
            ToolOutput::Code(code) => json!({
                "result": "1 test case generated",
                "test_file_path": code.test_file_path,
            }),
            ToolOutput::Plan(plan) => json!({
                "result": "Test plan markdown generated successfully",
                "file_path": plan.file_path,
                "test_cases": plan.test_case_count,
            }),
        };
        value.to_string()
    }
}

/// A registered tool: immutable after startup.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
    pub handle: Arc<dyn Tool>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, handle: Arc<dyn Tool>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: handle.kind(),
            handle,
        }
    }

    pub fn input_schema(&self) -> Value {
        self.kind.input_schema()
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Name → tool lookup, preserving registration order for prompt rendering.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<()> {
        if self.index.contains_key(&spec.name) {
            return Err(NavigatorError::Config(format!(
                "tool '{}' registered twice",
                spec.name
            )));
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name.trim()).map(|&i| &self.specs[i])
    }

    pub fn list(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Looks up `name` and validates `raw` against its schema.
    pub fn resolve(&self, name: &str, raw: &str) -> Result<(&ToolSpec, ToolInput)> {
        let spec = self
            .get(name)
            .ok_or_else(|| NavigatorError::UnknownTool(name.trim().to_string()))?;
        let input = spec.kind.parse_input(raw)?;
        Ok((spec, input))
    }
}
