//! Generation client: rate-limited, retrying access to the text-generation
//! service.
//!
//! The client is assembled from three pieces:
//! - **[`rate_limit::RateLimiter`]** — process-wide minimum interval between
//!   outbound calls, shared by every concurrent query.
//! - **[`ChatTransport`]** — one HTTP-style attempt against the service.
//!   The production implementation is [`HttpTransport`] (reqwest); tests
//!   substitute a scripted mock.
//! - **[`prompt`]** / **[`validate`]** — prompt construction and post-hoc
//!   answer validation, both pure.
//!
//! # Retry Strategy
//!
//! - HTTP 429 → exponential backoff: `base × 2^attempt + buffer`.
//! - Connection errors (including per-attempt timeouts) → fixed-delay retry.
//! - Any other non-success status → fail immediately.
//! - At most 5 attempts (configurable); exhaustion surfaces a generation
//!   error the orchestrator converts into a user-visible failure.

pub mod prompt;
pub mod rate_limit;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::LlmConfig;
use self::rate_limit::RateLimiter;

/// Payload for one chat-completion attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// How a single transport attempt can fail.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("generation service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// Terminal generation failures surfaced to the orchestrator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
    #[error("generation service rejected the request: {0}")]
    Rejected(String),
}

/// One attempt against the text-generation service.
///
/// Implementations perform exactly one request per call; retry and rate
/// control live in [`GenerationClient`] so they apply uniformly to every
/// backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one request and return the first generated message's text.
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

// ============ HTTP transport ============

/// Production transport calling `POST {base_url}/chat/completions`.
///
/// The reqwest client carries a per-attempt timeout, so a hung request is
/// bounded on every retry rather than only in aggregate.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransportError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        extract_message_text(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
fn extract_message_text(json: &serde_json::Value) -> Result<String, TransportError> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| TransportError::Status {
            status: 200,
            message: "response has no message content".to_string(),
        })?;

    if content.trim().is_empty() {
        return Err(TransportError::Status {
            status: 200,
            message: "response content is empty".to_string(),
        });
    }

    Ok(content.trim().to_string())
}

// ============ Generation client ============

/// Rate-limited, retrying front door to the generation service.
pub struct GenerationClient {
    transport: Arc<dyn ChatTransport>,
    limiter: Arc<RateLimiter>,
    config: LlmConfig,
}

impl GenerationClient {
    pub fn new(
        config: LlmConfig,
        transport: Arc<dyn ChatTransport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            transport,
            limiter,
            config,
        }
    }

    /// Build a client with the HTTP transport and a fresh limiter from
    /// configuration.
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(config.min_interval_secs),
            Duration::from_secs(config.startup_delay_secs),
        ));
        Ok(Self::new(config.clone(), transport, limiter))
    }

    /// Generate a completion for a composed prompt.
    ///
    /// Waits on the shared rate limiter once, then drives the retry loop.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.limiter.acquire().await;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        let max_attempts = self.config.max_attempts;
        let mut last_message = String::new();

        for attempt in 0..max_attempts {
            match self.transport.send(&request).await {
                Ok(text) => {
                    tracing::debug!(attempt, "generation succeeded");
                    return Ok(text);
                }
                Err(TransportError::RateLimited) => {
                    last_message = TransportError::RateLimited.to_string();
                    if attempt + 1 < max_attempts {
                        let delay = self.backoff_delay(attempt);
                        tracing::debug!(
                            attempt,
                            delay_secs = delay.as_secs(),
                            "rate limited, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(TransportError::Connection(message)) => {
                    last_message = format!("connection error: {message}");
                    if attempt + 1 < max_attempts {
                        let delay = Duration::from_secs(self.config.retry_base_secs);
                        tracing::debug!(attempt, error = %message, "transient failure, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error @ TransportError::Status { .. }) => {
                    return Err(GenerationError::Rejected(error.to_string()));
                }
            }
        }

        Err(GenerationError::RetriesExhausted {
            attempts: max_attempts,
            message: last_message,
        })
    }

    /// Exponential backoff for rate-limited attempts:
    /// `base × 2^attempt + buffer`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self.config.retry_base_secs.saturating_mul(1u64 << attempt.min(16));
        Duration::from_secs(exponential.saturating_add(self.config.retry_buffer_secs))
    }
}
