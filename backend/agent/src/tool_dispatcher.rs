//! Dispatcher for agent tool calls.
//!
//! Invokes a resolved tool and applies the retry policy: transient failures
//! are re-invoked, structural ones come straight back as observations, and
//! fatal ones end the run.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use navigator_core::{NavigatorError, Observation, ToolInput, ToolOutput, ToolSpec};

pub struct ToolDispatcher {
    max_retries: usize,
}

/// Outcome of one dispatched call.
#[derive(Debug)]
pub struct ToolResult {
    pub observation: Observation,
    pub attempts: usize,
}

impl ToolDispatcher {
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }

    /// `Err` only for errors that end the run.
    pub async fn execute(
        &self,
        spec: &ToolSpec,
        input: ToolInput,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, NavigatorError> {
        let mut attempts = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(NavigatorError::Cancelled);
            }
            attempts += 1;
            debug!(tool = %spec.name, attempt = attempts, "Invoking tool");

            let error = match spec.handle.invoke(input.clone()).await {
                Ok(output) => return Ok(ToolResult { observation: observe(&output), attempts }),
                Err(e) => e,
            };

            let kind = error.kind();
            if kind.is_fatal() {
                return Err(error);
            }
            if !kind.is_transient() {
                return Ok(ToolResult { observation: failed(&error), attempts });
            }
            if attempts > self.max_retries {
                let exhausted = NavigatorError::ToolInvocationFailed {
                    tool: spec.name.clone(),
                    message: format!("gave up after {attempts} attempts: {error}"),
                };
                warn!(tool = %spec.name, attempts, error = %error, "Tool retries exhausted");
                return Ok(ToolResult { observation: failed(&exhausted), attempts });
            }
            warn!(tool = %spec.name, attempt = attempts, error = %error, "Transient tool failure, retrying");
        }
    }
}

fn observe(output: &ToolOutput) -> Observation {
    Observation::Ok { content: output.observation() }
}

pub(crate) fn failed(error: &NavigatorError) -> Observation {
    Observation::Error { error: error.report() }
}
