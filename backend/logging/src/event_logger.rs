//! Agent Event Logger
//!
//! Structured per-run events (model output, tool call, observation, error)
//! emitted through `tracing` under the `agent_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ModelOutput {
        iteration: usize,
        content: String,
    },
    ToolCall {
        iteration: usize,
        tool_name: String,
        arguments_json: String,
    },
    Observation {
        iteration: usize,
        tool_name: String,
        is_error: bool,
        content: String,
    },
    Error {
        iteration: usize,
        kind: String,
        error_msg: String,
    },
    RunFinished {
        iterations: usize,
        success: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

/// Longest string payload kept in an event before truncation.
const MAX_EVENT_CHARS: usize = 2_000;

fn clip(text: &str) -> String {
    let redacted = redact_sensitive_data(text);
    if redacted.chars().count() <= MAX_EVENT_CHARS {
        return redacted;
    }
    let mut clipped: String = redacted.chars().take(MAX_EVENT_CHARS).collect();
    clipped.push_str("…");
    clipped
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts and clips the event, then emits it as one structured record.
    pub fn log_event(session_id: &str, mut event: AgentEvent) -> EventLogEntry {
        match &mut event {
            AgentEvent::ModelOutput { content, .. } | AgentEvent::Observation { content, .. } => {
                *content = clip(content);
            }
            AgentEvent::ToolCall { arguments_json, .. } => *arguments_json = clip(arguments_json),
            AgentEvent::Error { error_msg, .. } => *error_msg = clip(error_msg),
            AgentEvent::RunFinished { .. } => {}
        }

        let entry = EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let payload = serde_json::to_string(&entry.event).unwrap_or_default();
        info!(target: "agent_events", session_id = %entry.session_id, event = %payload, "Agent trace event");
        entry
    }
}
