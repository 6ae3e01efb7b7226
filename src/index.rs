//! Corpus-wide TF-IDF index.
//!
//! [`CorpusIndex::build`] computes the vocabulary, IDF table, and per-chunk
//! TF-IDF vectors for the full chunk set in one pass. An index is an
//! immutable value: corpus changes never mutate an existing index, they
//! build a fresh one that the owner publishes with a single pointer swap
//! (see [`crate::search::SearchEngine`]), so in-flight queries always read
//! one consistent generation.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::Chunk;
use crate::text::TextNormalizer;

/// One generation of the searchable corpus: vocabulary, IDF scores,
/// TF-IDF vectors, and the chunks themselves.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    vocabulary: HashMap<String, usize>,
    idf: HashMap<String, f64>,
    vectors: HashMap<String, Vec<f64>>,
    chunks: Vec<Chunk>,
}

/// Size counters surfaced by `cqa stats`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub chunk_count: usize,
    pub vocabulary_size: usize,
    pub vector_count: usize,
}

impl CorpusIndex {
    /// An index over no chunks. Searches against it return nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index from the full chunk set.
    ///
    /// Vocabulary is the sorted set of all normalized terms, truncated to
    /// `max_vocabulary` by keeping the lexicographically first N. The
    /// truncation policy biases large corpora toward alphabetically early
    /// terms; it is kept for bounded memory, not relevance.
    pub fn build(normalizer: &TextNormalizer, chunks: Vec<Chunk>, max_vocabulary: usize) -> Self {
        if chunks.is_empty() {
            return Self::empty();
        }

        let tokenized: Vec<Vec<String>> = chunks
            .iter()
            .map(|chunk| normalizer.normalize(&chunk.content))
            .collect();

        let all_terms: BTreeSet<&str> = tokenized
            .iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect();

        let vocabulary: HashMap<String, usize> = all_terms
            .into_iter()
            .take(max_vocabulary)
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();

        // Document frequency over vocabulary terms only; a term in the
        // vocabulary occurs in at least one chunk, so df >= 1 always.
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                if vocabulary.contains_key(term) {
                    *document_frequency.entry(term).or_insert(0) += 1;
                }
            }
        }

        let total_chunks = chunks.len() as f64;
        let idf: HashMap<String, f64> = document_frequency
            .into_iter()
            .map(|(term, df)| (term.to_string(), (total_chunks / df as f64).ln()))
            .collect();

        let mut vectors = HashMap::with_capacity(chunks.len());
        for (chunk, tokens) in chunks.iter().zip(&tokenized) {
            let mut vector = vec![0.0; vocabulary.len()];
            for (term, tf) in term_frequencies(tokens) {
                if let (Some(&idx), Some(&weight)) = (vocabulary.get(term), idf.get(term)) {
                    vector[idx] = tf * weight;
                }
            }
            vectors.insert(chunk.id.clone(), vector);
        }

        Self {
            vocabulary,
            idf,
            vectors,
            chunks,
        }
    }

    /// Project already-normalized query tokens into this generation's
    /// vocabulary space. Terms unseen in the corpus contribute zero and are
    /// silently dropped.
    pub fn query_vector(&self, tokens: &[String]) -> Vec<f64> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for (term, tf) in term_frequencies(tokens) {
            if let (Some(&idx), Some(&weight)) = (self.vocabulary.get(term), self.idf.get(term)) {
                vector[idx] = tf * weight;
            }
        }
        vector
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vector(&self, chunk_id: &str) -> Option<&[f64]> {
        self.vectors.get(chunk_id).map(Vec::as_slice)
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            chunk_count: self.chunks.len(),
            vocabulary_size: self.vocabulary.len(),
            vector_count: self.vectors.len(),
        }
    }
}

/// Term frequency: occurrence count divided by total token count.
///
/// The denominator counts every token, including ones later dropped by
/// vocabulary projection, matching how chunk vectors were built.
fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    if tokens.is_empty() {
        return HashMap::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let total = tokens.len() as f64;
    counts
        .into_iter()
        .map(|(term, count)| (term, count as f64 / total))
        .collect()
}
