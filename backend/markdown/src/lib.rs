//! Markdown helpers for model output and generated reports.
//!
//! Pulls fenced code out of LLM replies and builds the tables used in
//! test-plan documents.

pub mod code_block;
pub mod renderer;

pub use code_block::CodeBlockAnalyzer;
pub use renderer::{MarkdownTable, Renderer};
