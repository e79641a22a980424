//! Navigator Agent Runner
//!
//! The think/act/observe loop that drives a run: conversation history,
//! prompt building, reply parsing and tool dispatch.

pub mod agent_loop;
pub mod history;
pub mod response_parser;
pub mod session;
pub mod system_prompt;
pub mod tool_dispatcher;

#[cfg(test)]
mod scenarios;

pub use agent_loop::{AgentRunner, AgentSettings, RunContext, RunOutcome};
pub use history::ConversationHistory;
pub use response_parser::{parse_response, ParsedResponse};
pub use session::prepare_run;
pub use system_prompt::{PromptBuilder, DEFAULT_SYSTEM_PROMPT};
pub use tool_dispatcher::{ToolDispatcher, ToolResult};
