//! Navigator configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Unset optional fields are
//! filled in by [`crate::defaults`].

use navigator_core::ToolKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::defaults::{
    DEFAULT_CODE_EXTENSION, DEFAULT_FRAMEWORK, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_GENERATIONS,
    DEFAULT_MAX_HISTORY, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OBSERVATION_CHARS,
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_TEST_CASES, DEFAULT_OUTPUT_DIR, DEFAULT_STOPPING_CONDITION,
    DEFAULT_TIMEOUT_SECS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigatorConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Language-model bindings keyed by name.
    #[serde(default)]
    pub llms: BTreeMap<String, LlmConfig>,

    /// Tool bindings keyed by the name the agent uses.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionConfig>,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// General / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Directory for the rolling NDJSON log; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// LLMs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    Openai,
    Ollama,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "_type")]
    pub provider: LlmProviderType,

    #[serde(default)]
    pub model_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Canned replies for the `mock` provider, returned in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<String>,
}

impl LlmConfig {
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.0)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(2048)
    }
}

// ---------------------------------------------------------------------------
// Functions (tools)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(rename = "_type")]
    pub kind: ToolKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// LLM used by the tool itself (synthesis, code generation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,

    // web_navigator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_request_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_schemes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_hosts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesize_tests: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_test_cases: Option<usize>,

    // generate_test_automation_code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_generations: Option<usize>,
}

impl FunctionConfig {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            description: None,
            llm_name: None,
            timeout_secs: None,
            max_body_bytes: None,
            min_request_interval_ms: None,
            allowed_schemes: None,
            blocked_hosts: None,
            user_agent: None,
            synthesize_tests: None,
            max_test_cases: None,
            max_generations: None,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn max_test_cases(&self) -> usize {
        self.max_test_cases.unwrap_or(DEFAULT_MAX_TEST_CASES)
    }

    pub fn max_generations(&self) -> usize {
        self.max_generations.unwrap_or(DEFAULT_MAX_GENERATIONS)
    }
}

// ---------------------------------------------------------------------------
// Workflow (agent loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub tool_names: Vec<String>,

    #[serde(default)]
    pub llm_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_condition: Option<String>,

    /// Template with `{tools}`, `{tool_names}` and `{stopping_condition}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_observation_chars: Option<usize>,
}

impl WorkflowConfig {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    pub fn max_history(&self) -> usize {
        self.max_history.unwrap_or(DEFAULT_MAX_HISTORY)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn stopping_condition(&self) -> &str {
        self.stopping_condition
            .as_deref()
            .unwrap_or(DEFAULT_STOPPING_CONDITION)
    }

    pub fn max_observation_chars(&self) -> usize {
        self.max_observation_chars
            .unwrap_or(DEFAULT_MAX_OBSERVATION_CHARS)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Human name of the automation framework used in prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// File suffix of generated test sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl OutputConfig {
    pub fn dir(&self) -> &str {
        self.dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    pub fn framework(&self) -> &str {
        self.framework.as_deref().unwrap_or(DEFAULT_FRAMEWORK)
    }

    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(DEFAULT_CODE_EXTENSION)
    }
}
