//! `navigator-tools`: the tools the QA agent can call.

pub mod artifact;
pub mod code_gen;
pub mod factory;
pub mod plan_writer;
pub mod synthesizer;
pub mod web;

pub use code_gen::{CodeGenOptions, CodeGeneratorTool};
pub use factory::{build_registry, default_description};
pub use plan_writer::{render_plan, PlanWriterTool};
pub use synthesizer::TestCaseSynthesizer;
pub use web::{analyze_html, NavigatorOptions, WebNavigatorTool};

use navigator_core::{NavigatorError, ToolInput, ToolKind};

/// The registry routes inputs by kind, so this only fires on a wiring bug.
pub(crate) fn mismatched_input(kind: ToolKind, input: &ToolInput) -> NavigatorError {
    NavigatorError::ToolInvocationFailed {
        tool: kind.as_str().to_string(),
        message: format!("received input meant for {}", input.kind()),
    }
}
