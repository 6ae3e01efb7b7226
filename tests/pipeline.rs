//! End-to-end pipeline tests against a scripted generation transport.
//!
//! All timing-sensitive tests run under tokio's paused clock, so rate-limit
//! waits and retry backoffs are observed exactly without real sleeping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use corpus_qa::config::{ChunkingConfig, Config, CorpusConfig, LlmConfig, SearchConfig};
use corpus_qa::llm::rate_limit::RateLimiter;
use corpus_qa::llm::{ChatRequest, ChatTransport, GenerationClient, GenerationError, TransportError};
use corpus_qa::models::{Chunk, Intent};
use corpus_qa::pipeline::{Pipeline, PipelineError};
use corpus_qa::search::SearchEngine;

/// One observed transport attempt: the composed prompt and when it happened.
struct RecordedCall {
    prompt: String,
    at: Instant,
}

/// Transport that replays a scripted sequence of outcomes and records
/// every attempt. An exhausted script answers with a stock success.
struct MockTransport {
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    fn new(script: Vec<Result<String, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Instant)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| (call.prompt.clone(), call.at))
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: request.messages[0].content.clone(),
            at: Instant::now(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Stock answer.".to_string()))
    }
}

fn test_config() -> Config {
    Config {
        corpus: CorpusConfig {
            root: ".".into(),
            include_globs: vec![],
            exclude_globs: vec![],
        },
        chunking: ChunkingConfig::default(),
        search: SearchConfig::default(),
        llm: LlmConfig::default(),
    }
}

fn make_pipeline(transport: Arc<MockTransport>) -> Pipeline {
    let config = test_config();
    let engine = Arc::new(SearchEngine::new(&config.search));
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_secs(config.llm.min_interval_secs),
        Duration::from_secs(config.llm.startup_delay_secs),
    ));
    let llm = GenerationClient::new(config.llm.clone(), transport, limiter);
    Pipeline::new(&config, engine, llm)
}

fn chunk(id: &str, content: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        document_id: "doc".to_string(),
        chunk_index: 0,
        content: content.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn greeting_short_circuits_without_retrieval_or_generation() {
    let transport = MockTransport::new(vec![]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![chunk("c1", "Refunds are processed within 30 days")]);

    let start = Instant::now();
    let response = pipeline.answer_query("hi there").await.unwrap();

    assert_eq!(response.intent, Intent::Greeting);
    assert!(response.answer.contains("Hello"));
    assert!(response.chunks.is_empty());
    assert_eq!(response.confidence, 1.0);
    assert_eq!(transport.call_count(), 0);
    // No rate-limit wait happened: the canned reply is immediate even
    // though the minimum LLM call interval is 5 seconds.
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn empty_corpus_takes_no_context_path() {
    let transport = MockTransport::new(vec![Ok("I cannot answer without documents.".to_string())]);
    let pipeline = make_pipeline(transport.clone());

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();

    assert_eq!(response.intent, Intent::Question);
    assert!(response.chunks.is_empty());
    assert!(response.reference_mapping.is_empty());
    assert_eq!(response.confidence, 0.5);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("No document context is available"));
}

#[tokio::test(start_paused = true)]
async fn nothing_above_threshold_behaves_like_empty_corpus() {
    let transport = MockTransport::new(vec![Ok("I don't have information on that.".to_string())]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![
        chunk("c1", "Refunds are processed within thirty days of purchase."),
        chunk("c2", "Shipping charges are refunded for defective items only."),
        chunk("c3", "Contact billing to request a refund form."),
    ]);

    let response = pipeline
        .answer_query("quantum entanglement basics")
        .await
        .unwrap();

    assert!(response.chunks.is_empty());
    assert_eq!(response.confidence, 0.5);
    assert!(transport.calls()[0].0.contains("No document context is available"));
}

#[tokio::test(start_paused = true)]
async fn grounded_answer_cites_the_matching_chunk() {
    let transport =
        MockTransport::new(vec![Ok("Refunds are processed within 30 days.".to_string())]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![chunk("c1", "Refunds are processed within 30 days")]);

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();

    assert_eq!(response.intent, Intent::Question);
    assert_eq!(response.chunks.len(), 1);
    assert_eq!(response.chunks[0].id, "c1");
    assert_eq!(response.reference_mapping.len(), 1);
    assert_eq!(response.reference_mapping[&1].id, "c1");
    assert_eq!(response.confidence, 1.0);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("Refunds are processed within 30 days"));
    assert!(calls[0].0.contains("only the context below"));
}

#[tokio::test(start_paused = true)]
async fn citation_ordinals_are_sequential_over_used_chunks() {
    let transport = MockTransport::new(vec![Ok("See the policy details.".to_string())]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![
        chunk("c1", "Refund policy: refunds are processed within thirty days."),
        chunk("c2", "Refund policy details: refund requests require a receipt."),
    ]);

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();

    assert!(response.chunks.len() >= 2);
    let ordinals: Vec<usize> = response.reference_mapping.keys().copied().collect();
    assert_eq!(ordinals, (1..=response.chunks.len()).collect::<Vec<_>>());
    for (ordinal, chunk) in &response.reference_mapping {
        assert_eq!(chunk, &response.chunks[ordinal - 1]);
    }
}

#[tokio::test(start_paused = true)]
async fn rate_limited_attempts_back_off_with_increasing_delays() {
    let transport = MockTransport::new(vec![
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Ok("Recovered answer.".to_string()),
    ]);
    let pipeline = make_pipeline(transport.clone());

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();
    assert_eq!(response.answer, "Recovered answer.");

    let calls = transport.calls();
    assert_eq!(calls.len(), 5);

    // base 1s, buffer 1s: delays of 2, 3, 5, 9 seconds between attempts
    let gaps: Vec<Duration> = calls
        .windows(2)
        .map(|pair| pair[1].1.duration_since(pair[0].1))
        .collect();
    assert_eq!(
        gaps,
        vec![
            Duration::from_secs(2),
            Duration::from_secs(3),
            Duration::from_secs(5),
            Duration::from_secs(9),
        ]
    );
    for pair in gaps.windows(2) {
        assert!(pair[1] > pair[0], "backoff must strictly increase");
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_a_generation_error() {
    let transport = MockTransport::new(vec![
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
        Err(TransportError::RateLimited),
    ]);
    let pipeline = make_pipeline(transport.clone());

    let error = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PipelineError::Generation(GenerationError::RetriesExhausted { attempts: 5, .. })
    ));
    assert_eq!(transport.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn connection_errors_retry_with_fixed_delay() {
    let transport = MockTransport::new(vec![
        Err(TransportError::Connection("reset by peer".to_string())),
        Err(TransportError::Connection("reset by peer".to_string())),
        Ok("Eventually fine.".to_string()),
    ]);
    let pipeline = make_pipeline(transport.clone());

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();
    assert_eq!(response.answer, "Eventually fine.");

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    let gaps: Vec<Duration> = calls
        .windows(2)
        .map(|pair| pair[1].1.duration_since(pair[0].1))
        .collect();
    assert_eq!(gaps, vec![Duration::from_secs(1), Duration::from_secs(1)]);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_status_fails_on_first_attempt() {
    let transport = MockTransport::new(vec![Err(TransportError::Status {
        status: 500,
        message: "internal error".to_string(),
    })]);
    let pipeline = make_pipeline(transport.clone());

    let error = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PipelineError::Generation(GenerationError::Rejected(_))
    ));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn pii_query_is_refused_before_any_generation() {
    let transport = MockTransport::new(vec![]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![chunk("c1", "Refunds are processed within 30 days")]);

    let error = pipeline
        .answer_query("what does my record 123-45-6789 say")
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Refusal(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn flagged_answer_is_returned_with_lowered_confidence() {
    let answer = "Recent studies show that refunds improved by 95% since 2031.";
    let transport = MockTransport::new(vec![Ok(answer.to_string())]);
    let pipeline = make_pipeline(transport.clone());
    pipeline.rebuild_corpus(vec![chunk("c1", "Refunds are processed within 30 days")]);

    let response = pipeline
        .answer_query("What is the refund policy?")
        .await
        .unwrap();

    // One hallucination phrase and two ungrounded figures: -0.1 - 0.05 - 0.05
    assert_eq!(response.answer, answer);
    assert!((response.confidence - 0.75).abs() < 1e-9);
    assert_eq!(response.chunks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_query_gets_guidance_not_an_error() {
    let transport = MockTransport::new(vec![]);
    let pipeline = make_pipeline(transport.clone());

    let response = pipeline.answer_query("").await.unwrap();
    assert_eq!(response.intent, Intent::Unclear);
    assert!(response.answer.contains("rephrase"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_questions_serialize_on_the_rate_limiter() {
    let transport = MockTransport::new(vec![
        Ok("First answer.".to_string()),
        Ok("Second answer.".to_string()),
    ]);
    let pipeline = Arc::new(make_pipeline(transport.clone()));

    let start = Instant::now();
    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.answer_query("What is the refund policy?").await }
    });
    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.answer_query("What are the shipping rules?").await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // 5s startup delay for the first call, 5s minimum interval before the
    // second; neither call may slip through early.
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1.duration_since(calls[0].1), Duration::from_secs(5));
}
