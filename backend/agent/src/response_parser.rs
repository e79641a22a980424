//! Parser for the Thought / Action / Action Input / Final Answer protocol.

use once_cell::sync::Lazy;
use regex::Regex;

use navigator_core::{NavigatorError, Result};

static ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:(.*?)\n\s*Action\s*\d*\s*Input\s*\d*\s*:(.*)").unwrap()
});
static ACTION_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Action\s*\d*\s*:").unwrap());
static THOUGHT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*Thought\s*:\s*").unwrap());
static OBSERVATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*Observation\s*:").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Action {
        thought: String,
        action: String,
        action_input: String,
    },
    Final {
        thought: String,
        answer: String,
    },
}

/// Parses one model reply.
///
/// Any occurrence of `stopping_condition` ends the run, even when an action
/// is also present.
pub fn parse_response(text: &str, stopping_condition: &str) -> Result<ParsedResponse> {
    if !stopping_condition.is_empty() {
        if let Some(pos) = text.find(stopping_condition) {
            let answer = text[pos + stopping_condition.len()..].trim().to_string();
            return Ok(ParsedResponse::Final {
                thought: thought_of(&text[..pos]),
                answer,
            });
        }
    }

    let Some(caps) = ACTION.captures(text) else {
        let message = if ACTION_ONLY.is_match(text) {
            "Invalid Format: Missing 'Action Input:' after 'Action:'"
        } else {
            "Invalid Format: Missing 'Action:' after 'Thought:'"
        };
        return Err(NavigatorError::ParseError(message.into()));
    };

    let action = caps[1]
        .trim()
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '[' | ']' | '*'))
        .trim()
        .to_string();
    if action.is_empty() {
        return Err(NavigatorError::ParseError(
            "Invalid Format: 'Action:' names no tool".into(),
        ));
    }

    // Models sometimes continue past the input and invent an observation.
    let raw_input = &caps[2];
    let raw_input = match OBSERVATION.find(raw_input) {
        Some(m) => &raw_input[..m.start()],
        None => raw_input,
    };
    let action_input = raw_input.trim().to_string();
    if action_input.is_empty() {
        return Err(NavigatorError::ParseError(
            "Invalid Format: 'Action Input:' is empty".into(),
        ));
    }

    let head = caps.get(0).map_or(0, |m| m.start());
    Ok(ParsedResponse::Action {
        thought: thought_of(&text[..head]),
        action,
        action_input,
    })
}

/// Drops anything after an invented `Observation:` line.
pub fn strip_invented_observation(text: &str) -> &str {
    match OBSERVATION.find(text) {
        Some(m) => text[..m.start()].trim_end(),
        None => text.trim_end(),
    }
}

fn thought_of(text: &str) -> String {
    THOUGHT_PREFIX.replace(text.trim(), "").trim().to_string()
}
