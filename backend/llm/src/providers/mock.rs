use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use navigator_core::{LlmProvider, LlmRequest, LlmResponse};

/// A mock LLM provider that plays back a script of canned replies.
///
/// Once the script is exhausted the fixed response is repeated; without one,
/// further calls fail.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<MockReply>>,
    fixed_response: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fixed_response: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_script<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_replies(replies.into_iter().map(|r| MockReply::Text(r.into())))
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(replies);
        }
        self
    }

    /// Number of `complete` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.or_else(|| self.fixed_response.clone().map(MockReply::Text))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }

        let content = match self.next_reply() {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Fail(message)) => anyhow::bail!("{message}"),
            None => anyhow::bail!("mock provider '{}' has no scripted reply left", self.name),
        };

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: req.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_fixed_response() {
        let provider = MockProvider::new("mock")
            .with_script(["first", "second"])
            .with_response("again");
        let req = LlmRequest::single("m", "sys", "hi");

        assert_eq!(provider.complete(&req).await.unwrap().content, "first");
        assert_eq!(provider.complete(&req).await.unwrap().content, "second");
        assert_eq!(provider.complete(&req).await.unwrap().content, "again");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn scripted_failure_and_exhaustion() {
        let provider = MockProvider::new("mock")
            .with_replies([MockReply::Fail("boom".into()), MockReply::Text("ok".into())]);
        let req = LlmRequest::single("m", "sys", "hi");

        assert!(provider.complete(&req).await.is_err());
        assert_eq!(provider.complete(&req).await.unwrap().content, "ok");
        assert!(provider.complete(&req).await.is_err());
        assert_eq!(provider.requests().len(), 3);
    }
}
