//! Post-hoc answer validation against the context actually supplied.
//!
//! Validation never blocks an answer — it only annotates confidence and an
//! issue list. Two heuristics drive the score: stock hallucination phrases,
//! and concrete figures (4-digit numbers, percentages) that do not appear
//! anywhere in the supplied context.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Phrases that signal an answer drifting away from the provided context.
const HALLUCINATION_PHRASES: &[&str] = &[
    "recent studies show",
    "experts agree",
    "studies have shown",
    "it is widely accepted",
    "research indicates",
];

const PHRASE_PENALTY: f64 = 0.1;
const UNGROUNDED_FIGURE_PENALTY: f64 = 0.05;
const VALID_THRESHOLD: f64 = 0.7;

/// Confidence assigned when no context was supplied; context-independent
/// answers are not checked for grounding.
const NO_CONTEXT_CONFIDENCE: f64 = 0.5;

/// Outcome of the validation pass.
#[derive(Debug, Clone)]
pub struct AnswerValidation {
    pub confidence: f64,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

fn figure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b\d{4}\b|\b\d+(?:\.\d+)?%").expect("figure pattern must compile")
    })
}

/// Score an answer against the context it was generated from.
///
/// Confidence starts at 1.0; each hallucination phrase costs 0.1 and each
/// distinct ungrounded figure costs 0.05, floored at 0.0. An answer is
/// considered valid while confidence stays above 0.7.
pub fn validate_answer(answer: &str, context: Option<&str>) -> AnswerValidation {
    let Some(context) = context else {
        return AnswerValidation {
            confidence: NO_CONTEXT_CONFIDENCE,
            is_valid: true,
            issues: Vec::new(),
        };
    };

    let mut confidence = 1.0;
    let mut issues = Vec::new();

    let lowered = answer.to_lowercase();
    for phrase in HALLUCINATION_PHRASES {
        if lowered.contains(phrase) {
            confidence -= PHRASE_PENALTY;
            issues.push(format!("hallucination phrase: \"{phrase}\""));
        }
    }

    let figures: BTreeSet<&str> = figure_pattern()
        .find_iter(answer)
        .map(|m| m.as_str())
        .collect();
    for figure in figures {
        if !context.contains(figure) {
            confidence -= UNGROUNDED_FIGURE_PENALTY;
            issues.push(format!("figure not found in context: {figure}"));
        }
    }

    let confidence = confidence.max(0.0);
    AnswerValidation {
        confidence,
        is_valid: confidence > VALID_THRESHOLD,
        issues,
    }
}
