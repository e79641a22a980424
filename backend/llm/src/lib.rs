pub mod client;
pub mod providers;

pub use client::LlmClient;
pub use providers::mock::{MockProvider, MockReply};
pub use providers::ollama::OllamaProvider;
pub use providers::openai::OpenAiProvider;
pub use providers::{build_provider, ProviderRegistry};
