//! `navigator-core`: shared types, error taxonomy and the tool registry.

pub mod error;
pub mod tools;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, ErrorReport, NavigatorError, Result};
pub use tools::{
    find_url, loose_json, CodeGenInput, NavigateInput, PlanInput, ToolInput, ToolKind, ToolOutput,
    ToolRegistry, ToolSpec,
};
pub use traits::{LlmProvider, LlmRequest, LlmResponse, Tool};
pub use types::{
    AgentStep, GeneratedCode, Observation, PageAnalysis, PlanArtifact, Role, TestCase, TestPlan,
    Turn,
};
