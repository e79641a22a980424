use anyhow::Result;
use async_trait::async_trait;

use crate::error::NavigatorError;
use crate::tools::{ToolInput, ToolKind, ToolOutput};
use crate::types::Turn;

/// A capability that the agent can invoke by name.
///
/// Inputs arrive already validated by the registry, so implementations only
/// see the variant matching their [`ToolKind`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    async fn invoke(&self, input: ToolInput) -> std::result::Result<ToolOutput, NavigatorError>;
}

/// Trait for language-model backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    /// Conversation turns after the system prompt, oldest first.
    pub messages: Vec<Turn>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl LlmRequest {
    /// One-shot request: a system prompt and a single user message.
    pub fn single(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            messages: vec![Turn::user(user_prompt)],
            max_tokens: 2048,
            temperature: 0.0,
            stop: Vec::new(),
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
