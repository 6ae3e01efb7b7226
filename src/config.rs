use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    250
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,
    #[serde(default = "default_max_vocabulary")]
    pub max_vocabulary: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_word_length: default_min_word_length(),
            max_vocabulary: default_max_vocabulary(),
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_min_word_length() -> usize {
    3
}
fn default_max_vocabulary() -> usize {
    10_000
}
fn default_top_k() -> usize {
    5
}
fn default_min_score() -> f64 {
    0.1
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens_llm")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
    #[serde(default = "default_retry_buffer_secs")]
    pub retry_buffer_secs: u64,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens_llm(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_secs: default_retry_base_secs(),
            retry_buffer_secs: default_retry_buffer_secs(),
            min_interval_secs: default_min_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}
fn default_model() -> String {
    "mistral-large-latest".to_string()
}
fn default_api_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}
fn default_max_tokens_llm() -> u32 {
    1000
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.9
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_base_secs() -> u64 {
    1
}
fn default_retry_buffer_secs() -> u64 {
    1
}
fn default_min_interval_secs() -> u64 {
    5
}
fn default_startup_delay_secs() -> u64 {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    if config.search.top_k == 0 {
        anyhow::bail!("search.top_k must be >= 1");
    }

    if config.search.max_vocabulary == 0 {
        anyhow::bail!("search.max_vocabulary must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.search.min_score) {
        anyhow::bail!("search.min_score must be in [0.0, 1.0]");
    }

    if config.llm.max_attempts == 0 {
        anyhow::bail!("llm.max_attempts must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}
