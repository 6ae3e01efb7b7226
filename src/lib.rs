//! # corpus-qa
//!
//! A local-first retrieval-augmented question answering engine for private
//! document corpora.
//!
//! corpus-qa answers natural-language questions by retrieving relevant text
//! fragments from an in-memory hybrid index (TF-IDF cosine + word overlap)
//! and asking a language model to compose an answer grounded in them, with
//! intent-aware routing, strict outbound rate control, and post-hoc answer
//! validation with citations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │  Corpus  │──▶│  Corpus Index  │──▶│ Fusion/Rank  │
//! │  loader  │   │ vocab+IDF+vecs │   │ 0.7kw+0.3sem │
//! └──────────┘   └────────────────┘   └──────┬───────┘
//!                                            │
//!   query ──▶ intent ──▶ transform ──────────┤
//!                │                           ▼
//!                │short-circuit      ┌──────────────┐
//!                ▼                   │  Generation  │
//!            canned reply           │ rate-limited │
//!                                    └──────┬───────┘
//!                                           ▼
//!                                 answer + citations
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cqa --config ./config/cqa.toml ask "What is the refund policy?"
//! cqa --config ./config/cqa.toml search "refund"
//! cqa --config ./config/cqa.toml stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`text`] | Text normalization shared by indexing and queries |
//! | [`index`] | Corpus-wide TF-IDF index |
//! | [`search`] | Keyword + semantic engines, fusion, re-ranking |
//! | [`intent`] | Intent classification and canned responses |
//! | [`query`] | Query transformation and PII screening |
//! | [`llm`] | Rate-limited generation client, prompts, validation |
//! | [`pipeline`] | Query-to-answer orchestration |
//! | [`chunk`] | Paragraph-boundary chunker (ingestion shim) |
//! | [`corpus_fs`] | Filesystem corpus loader (ingestion shim) |

pub mod chunk;
pub mod config;
pub mod corpus_fs;
pub mod index;
pub mod intent;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod search;
pub mod text;
