pub mod mock;
pub mod ollama;
pub mod openai;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use navigator_config::{LlmConfig, LlmProviderType};
use navigator_core::LlmProvider;

use crate::client::LlmClient;

/// Registry of configured model bindings, looked up by config name.
pub struct ProviderRegistry {
    clients: HashMap<String, LlmClient>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Build one client per entry of the `llms` config section.
    pub fn from_config(llms: &BTreeMap<String, LlmConfig>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, config) in llms {
            let provider = build_provider(config)
                .with_context(|| format!("Failed to build LLM '{name}'"))?;
            let client = LlmClient::new(provider, config.model_name.clone())
                .with_sampling(config.max_tokens(), config.temperature());
            debug!(llm = %name, provider = ?config.provider, model = %config.model_name, "LLM registered");
            registry.register(name.clone(), client);
        }
        Ok(registry)
    }

    /// Register a client by name, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, client: LlmClient) {
        self.clients.insert(name.into(), client);
    }

    pub fn get(&self, name: &str) -> Option<LlmClient> {
        self.clients.get(name).cloned()
    }

    /// Get all registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate the backend named by `config.provider`.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = config.timeout_secs.map(Duration::from_secs);
    let provider: Arc<dyn LlmProvider> = match config.provider {
        LlmProviderType::Openai => {
            let mut provider = openai::OpenAiProvider::new(config.api_key.clone());
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            if let Some(timeout) = timeout {
                provider = provider.with_timeout(timeout)?;
            }
            Arc::new(provider)
        }
        LlmProviderType::Ollama => {
            let mut provider = ollama::OllamaProvider::new();
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            if let Some(timeout) = timeout {
                provider = provider.with_timeout(timeout)?;
            }
            Arc::new(provider)
        }
        LlmProviderType::Mock => {
            Arc::new(mock::MockProvider::new("mock").with_script(config.responses.clone()))
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: LlmProviderType) -> LlmConfig {
        LlmConfig {
            provider,
            model_name: "model".into(),
            api_key: None,
            base_url: Some("http://localhost:9999".into()),
            temperature: Some(0.2),
            max_tokens: Some(512),
            timeout_secs: Some(5),
            responses: vec!["Final Answer: done".into()],
        }
    }

    #[test]
    fn registry_from_config() {
        let mut llms = BTreeMap::new();
        llms.insert("planner_llm".to_string(), llm(LlmProviderType::Openai));
        llms.insert("local".to_string(), llm(LlmProviderType::Ollama));
        llms.insert("scripted".to_string(), llm(LlmProviderType::Mock));

        let registry = ProviderRegistry::from_config(&llms).unwrap();
        assert_eq!(registry.list(), vec!["local", "planner_llm", "scripted"]);

        let client = registry.get("planner_llm").unwrap();
        assert_eq!(client.provider_name(), "openai");
        assert_eq!(client.model(), "model");
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn mock_config_replays_responses() {
        let provider = build_provider(&llm(LlmProviderType::Mock)).unwrap();
        let client = LlmClient::new(provider, "model");
        let reply = client.prompt("sys", "go").await.unwrap();
        assert_eq!(reply, "Final Answer: done");
    }
}
