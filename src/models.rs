//! Core data models used throughout corpus-qa.
//!
//! These types represent the chunks, search results, and pipeline responses
//! that flow through the retrieval and answer-generation pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A bounded fragment of a source document, the atomic unit of retrieval.
///
/// Chunks are handed to the core by the ingestion collaborator and are
/// immutable once created; the corpus index owns them for the lifetime of
/// an index generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
}

/// A scored chunk produced by the fusion & ranking stage.
///
/// `score` is the fused (and possibly boost-adjusted) relevance; the
/// per-engine scores are carried for display and debugging. An engine that
/// did not surface the chunk leaves its score as `None`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f64,
    pub keyword_score: Option<f64>,
    pub semantic_score: Option<f64>,
}

/// The classified purpose of a user query.
///
/// Only [`Intent::Question`] triggers retrieval and generation; every other
/// intent short-circuits to a canned response without touching the corpus
/// index or the generation client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Greeting,
    Thanks,
    Command,
    DocumentCommand,
    SystemCommand,
    Unclear,
    OutOfScope,
}

impl Intent {
    /// Intents that bypass retrieval and generation entirely.
    pub fn is_short_circuit(self) -> bool {
        self != Intent::Question
    }
}

/// Ordinal-to-chunk table used to render inline citations in an answer.
///
/// Ordinals are assigned in citation order as the response is assembled;
/// the mapping is display-only and never persisted.
pub type ReferenceMapping = BTreeMap<usize, Chunk>;

/// The final product of one pipeline run. Never mutated after return.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub answer: String,
    pub chunks: Vec<Chunk>,
    pub confidence: f64,
    pub intent: Intent,
    pub reference_mapping: ReferenceMapping,
}
