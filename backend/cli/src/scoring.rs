//! Scorers comparing a run's final answer with the expected one.

use clap::ValueEnum;

pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score in `[0.0, 1.0]`.
    fn score(&self, answer: &str, expected: &str) -> f64;
}

/// Case-insensitive substring match.
pub struct ContainsScorer;

impl Scorer for ContainsScorer {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn score(&self, answer: &str, expected: &str) -> f64 {
        let expected = normalize(expected);
        if expected.is_empty() {
            return 0.0;
        }
        if normalize(answer).contains(&expected) { 1.0 } else { 0.0 }
    }
}

/// Equality after trimming and collapsing whitespace.
pub struct ExactScorer;

impl Scorer for ExactScorer {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn score(&self, answer: &str, expected: &str) -> f64 {
        if normalize(answer) == normalize(expected) { 1.0 } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScorerKind {
    Contains,
    Exact,
}

impl ScorerKind {
    pub fn scorer(self) -> Box<dyn Scorer> {
        match self {
            ScorerKind::Contains => Box::new(ContainsScorer),
            ScorerKind::Exact => Box::new(ExactScorer),
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
