//! # corpus-qa CLI (`cqa`)
//!
//! The `cqa` binary is the primary interface for corpus-qa. It loads the
//! corpus configured in a TOML file, builds the in-memory hybrid index, and
//! answers questions against it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa ask "<question>"` | Run the full pipeline and print the answer with citations |
//! | `cqa search "<query>"` | Retrieval only: print fused and re-ranked chunks |
//! | `cqa stats` | Print corpus and index statistics |
//!
//! ## Examples
//!
//! ```bash
//! cqa --config ./config/cqa.toml ask "What is the refund policy?"
//! cqa --config ./config/cqa.toml ask "List the key deadlines" --shape list
//! cqa --config ./config/cqa.toml search "refund" --limit 3
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use corpus_qa::config::{self, Config};
use corpus_qa::corpus_fs;
use corpus_qa::llm::GenerationClient;
use corpus_qa::pipeline::{AnswerShape, Pipeline, PipelineError};
use corpus_qa::search::SearchEngine;

/// corpus-qa CLI — a local-first retrieval-augmented question answering
/// engine for private document corpora.
#[derive(Parser)]
#[command(
    name = "cqa",
    about = "corpus-qa — retrieval-augmented question answering over a private document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question against the corpus.
    Ask {
        question: String,
        /// Presentation of grounded answers.
        #[arg(long, value_enum, default_value = "prose")]
        shape: ShapeArg,
    },
    /// Retrieval only: show the fused and re-ranked chunks for a query.
    Search {
        query: String,
        /// Maximum results to print.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show corpus and index statistics.
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Prose,
    List,
    Table,
}

impl From<ShapeArg> for AnswerShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Prose => AnswerShape::Prose,
            ShapeArg::List => AnswerShape::List,
            ShapeArg::Table => AnswerShape::Table,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask { question, shape } => run_ask(&config, &question, shape.into()).await,
        Commands::Search { query, limit } => run_search(&config, &query, limit),
        Commands::Stats => run_stats(&config),
    }
}

fn build_engine(config: &Config) -> Result<Arc<SearchEngine>> {
    let chunks = corpus_fs::load_corpus(config)?;
    let engine = Arc::new(SearchEngine::new(&config.search));
    engine.rebuild_corpus(chunks);
    Ok(engine)
}

async fn run_ask(config: &Config, question: &str, shape: AnswerShape) -> Result<()> {
    let engine = build_engine(config)?;
    let llm = GenerationClient::from_config(&config.llm)?;
    let pipeline = Pipeline::new(config, engine, llm);

    match pipeline.answer_query_shaped(question, shape).await {
        Ok(response) => {
            println!("{}", response.answer);

            if !response.reference_mapping.is_empty() {
                println!();
                println!("References:");
                for (ordinal, chunk) in &response.reference_mapping {
                    println!(
                        "  [{}] {} (chunk {})",
                        ordinal, chunk.document_id, chunk.chunk_index
                    );
                }
            }

            println!();
            println!(
                "intent: {}  confidence: {:.2}",
                serde_json::to_string(&response.intent)?.trim_matches('"'),
                response.confidence
            );
            Ok(())
        }
        Err(PipelineError::Refusal(reason)) => {
            println!("I cannot answer this query: {reason}");
            Ok(())
        }
        Err(error @ PipelineError::Generation(_)) => Err(error.into()),
    }
}

fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let engine = build_engine(config)?;
    let limit = limit.unwrap_or(config.search.top_k);

    let results = engine.search(query, limit);
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (position, result) in results.iter().enumerate() {
        let excerpt: String = result.chunk.content.chars().take(120).collect();
        let keywords = engine
            .normalizer()
            .extract_keywords(&result.chunk.content, 5);
        println!(
            "{}. [{:.3}] {} (chunk {})",
            position + 1,
            result.score,
            result.chunk.document_id,
            result.chunk.chunk_index
        );
        println!(
            "    keyword: {}  semantic: {}",
            format_engine_score(result.keyword_score),
            format_engine_score(result.semantic_score)
        );
        println!("    keywords: {}", keywords.join(", "));
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
        println!();
    }

    Ok(())
}

fn format_engine_score(score: Option<f64>) -> String {
    match score {
        Some(value) => format!("{value:.3}"),
        None => "-".to_string(),
    }
}

fn run_stats(config: &Config) -> Result<()> {
    let engine = build_engine(config)?;
    let stats = engine.stats();

    println!("chunks:     {}", stats.chunk_count);
    println!("vocabulary: {}", stats.vocabulary_size);
    println!("vectors:    {}", stats.vector_count);
    Ok(())
}
