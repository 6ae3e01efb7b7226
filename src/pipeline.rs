//! Query-to-answer orchestration.
//!
//! One pipeline run is a straight-line state machine with no state carried
//! across queries:
//!
//! ```text
//! START → CLASSIFY → (short-circuit → RESPOND)
//!                  | (TRANSFORM → RETRIEVE → FILTER → GENERATE
//!                     → VALIDATE → CITE → RESPOND)
//! ```
//!
//! An empty corpus and a corpus where nothing clears the relevance
//! threshold behave identically: the generation client gets the no-context
//! prompt and the response carries no chunks. Only a forced refusal and an
//! exhausted generation surface as errors; every other condition produces a
//! normal, possibly low-confidence, response.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::intent::{canned_response, IntentClassifier};
use crate::llm::prompt::{build_prompt, format_context, PromptShape};
use crate::llm::validate::validate_answer;
use crate::llm::{GenerationClient, GenerationError};
use crate::models::{Chunk, PipelineResponse, ReferenceMapping};
use crate::query::QueryProcessor;
use crate::search::SearchEngine;

/// The two error-shaped outcomes of a query. Everything else — empty
/// corpus, empty query, degraded retrieval, validation flags — produces a
/// normal response.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I cannot answer this query: {0}")]
    Refusal(String),
    #[error("failed to generate an answer: {0}")]
    Generation(#[from] GenerationError),
}

/// Caller-selected presentation for grounded answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerShape {
    #[default]
    Prose,
    List,
    Table,
}

impl AnswerShape {
    fn prompt_shape(self) -> PromptShape {
        match self {
            AnswerShape::Prose => PromptShape::Grounded,
            AnswerShape::List => PromptShape::List,
            AnswerShape::Table => PromptShape::Table,
        }
    }
}

/// Per-process pipeline front door; each query runs independently against
/// whichever index generation is current when it starts.
pub struct Pipeline {
    search: Arc<SearchEngine>,
    classifier: IntentClassifier,
    processor: QueryProcessor,
    llm: GenerationClient,
    top_k: usize,
    min_score: f64,
}

impl Pipeline {
    pub fn new(config: &Config, search: Arc<SearchEngine>, llm: GenerationClient) -> Self {
        Self {
            search,
            classifier: IntentClassifier::new(),
            processor: QueryProcessor::new(),
            llm,
            top_k: config.search.top_k,
            min_score: config.search.min_score,
        }
    }

    /// Replace the searchable corpus. Safe to call at any time; in-flight
    /// queries keep the generation they started with.
    pub fn rebuild_corpus(&self, chunks: Vec<Chunk>) {
        self.search.rebuild_corpus(chunks);
    }

    /// Answer a query with prose formatting.
    pub async fn answer_query(&self, query: &str) -> Result<PipelineResponse, PipelineError> {
        self.answer_query_shaped(query, AnswerShape::Prose).await
    }

    /// Answer a query with a caller-selected answer shape.
    pub async fn answer_query_shaped(
        &self,
        query: &str,
        shape: AnswerShape,
    ) -> Result<PipelineResponse, PipelineError> {
        let intent = self.classifier.classify(query);
        debug!(?intent, "classified query");

        // Screening outranks intent: PII or sensitive content is refused
        // even when the query would otherwise short-circuit.
        if let Some(reason) = self.processor.refusal_reason(query) {
            info!(%reason, "refusing query");
            return Err(PipelineError::Refusal(reason));
        }

        if intent.is_short_circuit() {
            debug!(?intent, "short-circuiting without retrieval");
            return Ok(PipelineResponse {
                answer: canned_response(intent).to_string(),
                chunks: Vec::new(),
                confidence: 1.0,
                intent,
                reference_mapping: ReferenceMapping::new(),
            });
        }

        let transformed = self.processor.transform(query);
        debug!(%transformed, "transformed query");

        let results = self.search.search(&transformed, self.top_k);
        let retained: Vec<_> = results
            .into_iter()
            .filter(|result| result.score >= self.min_score)
            .collect();
        debug!(retained = retained.len(), "retrieval finished");

        let chunks: Vec<Chunk> = retained.into_iter().map(|result| result.chunk).collect();
        let context = format_context(&chunks);

        let prompt = build_prompt(&transformed, context.as_deref(), shape.prompt_shape());
        let answer = self.llm.generate(&prompt).await?;

        let validation = validate_answer(&answer, context.as_deref());
        if !validation.issues.is_empty() {
            info!(issues = ?validation.issues, "answer validation flagged issues");
        }

        let reference_mapping: ReferenceMapping = chunks
            .iter()
            .cloned()
            .enumerate()
            .map(|(position, chunk)| (position + 1, chunk))
            .collect();

        Ok(PipelineResponse {
            answer,
            chunks,
            confidence: validation.confidence,
            intent,
            reference_mapping,
        })
    }
}
