//! Structured logging for the navigator runtime.
//!
//! Handles subscriber setup, log redaction and per-run agent event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AgentEvent, EventLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
