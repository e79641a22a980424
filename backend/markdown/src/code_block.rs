//! Code Block Extraction
//!
//! Finds fenced code in LLM replies so generated sources can be written
//! without the surrounding prose.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};

pub struct CodeBlockAnalyzer;

impl CodeBlockAnalyzer {
    /// Extracts all fenced code blocks as `(language, content)` pairs.
    ///
    /// Indented blocks are ignored; unfenced source code is often indented.
    pub fn extract_blocks(markdown: &str) -> Vec<(String, String)> {
        let mut blocks = Vec::new();
        let mut current: Option<(String, String)> = None;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                    let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                    current = Some((lang, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, content)) = current.as_mut() {
                        content.push_str(&text);
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
                _ => {}
            }
        }
        blocks
    }

    /// Returns the code carried by a reply.
    ///
    /// A reply wrapped entirely in one fence is unwrapped; any other reply is
    /// returned trimmed, as written.
    pub fn unwrap_code(reply: &str) -> String {
        let trimmed = reply.trim();
        if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 3 {
            let mut blocks = Self::extract_blocks(trimmed);
            if blocks.len() == 1 {
                if let Some((_, content)) = blocks.pop() {
                    return content.trim_end().to_string();
                }
            }
        }
        trimmed.to_string()
    }
}
