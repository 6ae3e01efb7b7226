//! Hybrid search: TF-IDF cosine + word-overlap engines with weighted fusion.
//!
//! # Hybrid Scoring Algorithm
//!
//! 1. Fetch `2K` keyword candidates (TF-IDF cosine against the corpus index).
//! 2. Fetch `2K` semantic candidates (Jaccard word overlap over raw chunks).
//! 3. Merge by chunk id: `score = 0.7 × keyword + 0.3 × semantic`, where an
//!    engine that did not surface a chunk contributes 0.
//! 4. Apply re-ranking adjustments in fixed order (keyword boost, then
//!    length penalty/bonus).
//! 5. Re-sort descending and truncate to `K`.
//!
//! Adjusted scores may leave `[0, 1]`; callers get a total order, not a
//! normalized range.
//!
//! The engines are stateless over a pinned index generation: every query
//! clones the current `Arc<CorpusIndex>` once, and a concurrent rebuild
//! publishes a whole replacement index rather than mutating in place.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::SearchConfig;
use crate::index::{CorpusIndex, IndexStats};
use crate::models::{Chunk, SearchResult};
use crate::text::TextNormalizer;

/// Fusion weight for the TF-IDF keyword engine.
pub const KEYWORD_WEIGHT: f64 = 0.7;
/// Fusion weight for the word-overlap semantic engine.
pub const SEMANTIC_WEIGHT: f64 = 0.3;

/// Flat per-term bonus rewarding exact overlaps beyond the Jaccard ratio.
const OVERLAP_TERM_BOOST: f64 = 0.1;

// Re-ranking thresholds. Order matters: the keyword boost applies first,
// then exactly one of the length adjustments. A chunk of exactly 50 or 500
// characters gets neither length adjustment.
const KEYWORD_BOOST_FLOOR: f64 = 0.8;
const KEYWORD_BOOST: f64 = 0.10;
const SHORT_CONTENT_CHARS: usize = 50;
const SHORT_CONTENT_PENALTY: f64 = 0.10;
const LONG_CONTENT_CHARS: usize = 500;
const LONG_CONTENT_BONUS: f64 = 0.05;

/// A chunk scored by a single engine, addressed by corpus position so ties
/// can be broken by original corpus order.
#[derive(Debug, Clone, Copy)]
struct EngineHit {
    chunk_pos: usize,
    score: f64,
}

// ============ Keyword engine (TF-IDF cosine) ============

/// Score every indexed chunk by cosine similarity between the query's
/// TF-IDF vector and the chunk's stored vector.
///
/// Query terms unseen in the corpus vocabulary are silently dropped; they
/// contribute zero weight, never an error.
fn keyword_candidates(
    index: &CorpusIndex,
    normalizer: &TextNormalizer,
    query: &str,
    count: usize,
) -> Vec<EngineHit> {
    if index.is_empty() {
        return Vec::new();
    }

    let tokens = normalizer.normalize(query);
    let query_vector = index.query_vector(&tokens);

    let mut hits: Vec<EngineHit> = index
        .chunks()
        .iter()
        .enumerate()
        .filter_map(|(chunk_pos, chunk)| {
            index.vector(&chunk.id).map(|vector| EngineHit {
                chunk_pos,
                score: cosine_similarity(&query_vector, vector),
            })
        })
        .collect();

    sort_and_truncate(&mut hits, count);
    hits
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Two all-zero vectors are trivially equal (1.0); exactly one all-zero
/// vector shares nothing with the other (0.0).
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let a_is_zero = a.iter().all(|&x| x == 0.0);
    let b_is_zero = b.iter().all(|&x| x == 0.0);

    if a_is_zero && b_is_zero {
        return 1.0;
    }
    if a_is_zero || b_is_zero {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

// ============ Semantic engine (word overlap) ============

/// Score every chunk by Jaccard similarity of term sets, plus a flat boost
/// per exactly-overlapping term, clamped to `[0, 1]`.
fn semantic_candidates(
    index: &CorpusIndex,
    normalizer: &TextNormalizer,
    query: &str,
    count: usize,
) -> Vec<EngineHit> {
    if index.is_empty() {
        return Vec::new();
    }

    let query_terms = normalizer.term_set(query);

    let mut hits: Vec<EngineHit> = index
        .chunks()
        .iter()
        .enumerate()
        .map(|(chunk_pos, chunk)| {
            let chunk_terms = normalizer.term_set(&chunk.content);
            EngineHit {
                chunk_pos,
                score: overlap_score(&query_terms, &chunk_terms),
            }
        })
        .collect();

    sort_and_truncate(&mut hits, count);
    hits
}

/// Jaccard ratio with an exact-overlap bonus of `0.1 × |intersection|`.
pub fn overlap_score(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let jaccard = intersection as f64 / union as f64;
    (jaccard + OVERLAP_TERM_BOOST * intersection as f64).clamp(0.0, 1.0)
}

/// Sort descending by score, ties broken by original corpus order, and
/// truncate to the caller's requested count.
fn sort_and_truncate(hits: &mut Vec<EngineHit>, count: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_pos.cmp(&b.chunk_pos))
    });
    hits.truncate(count);
}

// ============ Fusion & re-ranking ============

/// Merge both engines' candidates by chunk, weight, re-rank, and truncate.
fn fuse_and_rank(
    index: &CorpusIndex,
    keyword: &[EngineHit],
    semantic: &[EngineHit],
    top_k: usize,
) -> Vec<SearchResult> {
    // chunk position -> (keyword score, semantic score). A chunk surfaced
    // by only one engine is retained with the other side absent.
    let mut merged: HashMap<usize, (Option<f64>, Option<f64>)> = HashMap::new();
    for hit in keyword {
        merged.entry(hit.chunk_pos).or_insert((None, None)).0 = Some(hit.score);
    }
    for hit in semantic {
        merged.entry(hit.chunk_pos).or_insert((None, None)).1 = Some(hit.score);
    }

    let chunks = index.chunks();
    let mut results: Vec<(usize, SearchResult)> = merged
        .into_iter()
        .map(|(chunk_pos, (keyword_score, semantic_score))| {
            let fused = KEYWORD_WEIGHT * keyword_score.unwrap_or(0.0)
                + SEMANTIC_WEIGHT * semantic_score.unwrap_or(0.0);
            (
                chunk_pos,
                SearchResult {
                    chunk: chunks[chunk_pos].clone(),
                    score: fused,
                    keyword_score,
                    semantic_score,
                },
            )
        })
        .collect();

    for (_, result) in &mut results {
        apply_ranking_adjustments(result);
    }

    results.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    results.truncate(top_k);

    results.into_iter().map(|(_, result)| result).collect()
}

/// The fixed-order re-ranking pass.
///
/// The order and thresholds are part of the retrieval contract: a strong
/// keyword match earns +0.10, very short content loses 0.10, and otherwise
/// long content earns +0.05. The result can leave `[0, 1]`.
fn apply_ranking_adjustments(result: &mut SearchResult) {
    if result.keyword_score.unwrap_or(0.0) > KEYWORD_BOOST_FLOOR {
        result.score += KEYWORD_BOOST;
    }

    let content_chars = result.chunk.content.chars().count();
    if content_chars < SHORT_CONTENT_CHARS {
        result.score -= SHORT_CONTENT_PENALTY;
    } else if content_chars > LONG_CONTENT_CHARS {
        result.score += LONG_CONTENT_BONUS;
    }
}

// ============ Search engine ============

/// Owns the published index generation and runs hybrid queries against it.
///
/// Rebuilds construct a fresh [`CorpusIndex`] off-lock and publish it with
/// a single pointer swap; readers pin whichever generation was current when
/// their query started.
pub struct SearchEngine {
    normalizer: TextNormalizer,
    max_vocabulary: usize,
    index: RwLock<Arc<CorpusIndex>>,
}

impl SearchEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            normalizer: TextNormalizer::new(config.min_word_length),
            max_vocabulary: config.max_vocabulary,
            index: RwLock::new(Arc::new(CorpusIndex::empty())),
        }
    }

    /// Replace the corpus wholesale. Idempotent: rebuilding with the same
    /// chunk set yields an equivalent index.
    pub fn rebuild_corpus(&self, chunks: Vec<Chunk>) {
        let next = Arc::new(CorpusIndex::build(
            &self.normalizer,
            chunks,
            self.max_vocabulary,
        ));
        let mut current = self
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = next;
    }

    /// Pin the current index generation.
    pub fn snapshot(&self) -> Arc<CorpusIndex> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run the full hybrid search (both engines, fusion, re-ranking) and
    /// return the top `top_k` results.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let index = self.snapshot();
        search_index(&index, &self.normalizer, query, top_k)
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }
}

/// Hybrid search against a pinned index generation.
pub fn search_index(
    index: &CorpusIndex,
    normalizer: &TextNormalizer,
    query: &str,
    top_k: usize,
) -> Vec<SearchResult> {
    if index.is_empty() || top_k == 0 {
        return Vec::new();
    }

    // Over-fetch so fusion is not starved when the engines disagree on
    // what is relevant.
    let candidate_count = top_k * 2;
    let keyword = keyword_candidates(index, normalizer, query, candidate_count);
    let semantic = semantic_candidates(index, normalizer, query, candidate_count);

    fuse_and_rank(index, &keyword, &semantic, top_k)
}
