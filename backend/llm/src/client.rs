use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use navigator_core::{LlmProvider, LlmRequest, LlmResponse, Turn};

/// A provider bound to a model and sampling parameters.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 2048,
            temperature: 0.0,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Multi-turn completion.
    pub async fn chat(
        &self,
        system_prompt: &str,
        messages: Vec<Turn>,
        stop: Vec<String>,
    ) -> Result<LlmResponse> {
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: system_prompt.to_string(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop,
        };
        self.send(&request).await
    }

    /// One-shot completion returning only the text.
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = LlmRequest::single(self.model.clone(), system_prompt, user_prompt)
            .with_sampling(self.max_tokens, self.temperature);
        Ok(self.send(&request).await?.content)
    }

    async fn send(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let provider = self.provider.name();
        match self.provider.complete(request).await {
            Ok(response) => {
                debug!(
                    provider = %provider,
                    model = %response.model,
                    tokens = response.tokens_used,
                    latency_ms = response.latency_ms,
                    "Provider responded"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Provider failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
