//! Bounded conversation history.
//!
//! The system turn is pinned; once the bound is hit the oldest other turns
//! are dropped first.

use std::collections::VecDeque;

use navigator_core::Turn;

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system: Turn,
    turns: VecDeque<Turn>,
    max_len: usize,
    dropped: usize,
}

impl ConversationHistory {
    /// `max_len` counts the system turn and is raised to 1 if smaller.
    pub fn new(system_prompt: impl Into<String>, max_len: usize) -> Self {
        Self {
            system: Turn::system(system_prompt),
            turns: VecDeque::new(),
            max_len: max_len.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turn_count() > self.max_len {
            self.turns.pop_front();
            self.dropped += 1;
        }
    }

    /// Turns held, the system turn included.
    pub fn turn_count(&self) -> usize {
        self.turns.len() + 1
    }

    pub fn system_prompt(&self) -> &str {
        &self.system.content
    }

    /// Turns after the system prompt, oldest first.
    pub fn messages(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Turns discarded by truncation so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navigator_core::Role;

    #[test]
    fn bound_holds_and_system_is_pinned() {
        let mut history = ConversationHistory::new("system", 4);
        for i in 0..10 {
            history.push(Turn::user(format!("turn {i}")));
            assert!(history.turn_count() <= 4);
        }
        assert_eq!(history.system_prompt(), "system");
        let turns = history.messages();
        assert_eq!(turns.len(), 3);
        assert!(turns.iter().all(|t| t.role == Role::User));
        assert_eq!(turns[0].content, "turn 7");
        assert_eq!(turns[2].content, "turn 9");
        assert_eq!(history.dropped(), 7);
    }

    #[test]
    fn minimal_bound_keeps_only_system() {
        let mut history = ConversationHistory::new("system", 0);
        history.push(Turn::user("task"));
        assert_eq!(history.turn_count(), 1);
        assert_eq!(history.dropped(), 1);
        assert!(history.messages().is_empty());
        assert_eq!(history.system_prompt(), "system");
    }
}
