//! Text normalization shared by chunk indexing and query processing.
//!
//! Both sides of the retrieval comparison must pass through the exact same
//! tokenization so their term spaces line up; the normalizer is deterministic
//! and side-effect-free.

use std::collections::{HashMap, HashSet};

/// Stop words filtered out of every term stream.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your",
    "his", "its", "our", "their",
];

/// Tokenizes raw text into lowercase alphabetic search terms.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    min_word_length: usize,
    stop_words: HashSet<&'static str>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TextNormalizer {
    pub fn new(min_word_length: usize) -> Self {
        Self {
            min_word_length,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Lowercase, replace every non-alphabetic character with whitespace,
    /// split, then drop short tokens and stop words. Token order is
    /// preserved.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
            .collect();

        cleaned
            .split_whitespace()
            .filter(|word| {
                word.len() >= self.min_word_length && !self.stop_words.contains(word)
            })
            .map(str::to_string)
            .collect()
    }

    /// Normalize into the unique term set, for overlap comparisons.
    pub fn term_set(&self, text: &str) -> HashSet<String> {
        self.normalize(text).into_iter().collect()
    }

    /// Frequency-ranked top terms of a text. Ties resolve alphabetically so
    /// the output is stable across runs.
    pub fn extract_keywords(&self, text: &str, max_keywords: usize) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in self.normalize(text) {
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(max_keywords)
            .map(|(word, _)| word)
            .collect()
    }
}
