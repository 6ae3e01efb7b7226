//! Filesystem corpus loader.
//!
//! Collaborator shim standing in for the excluded ingestion service: scans
//! the configured corpus root for text files matching the include/exclude
//! globs, chunks each file, and hands the resulting chunk set to
//! [`rebuild_corpus`](crate::pipeline::Pipeline::rebuild_corpus). Files are
//! visited in sorted relative-path order so the corpus order — and with it
//! every tie-break in retrieval — is deterministic.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::models::Chunk;

pub fn load_corpus(config: &Config) -> Result<Vec<Chunk>> {
    let corpus = &config.corpus;
    if !corpus.root.exists() {
        bail!("Corpus root does not exist: {}", corpus.root.display());
    }

    let include_set = build_globset(&corpus.include_globs)?;
    let exclude_set = build_globset(&corpus.exclude_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&corpus.root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&corpus.root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push((rel_str, path.to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut chunks = Vec::new();
    for (rel_str, path) in files {
        let body = std::fs::read_to_string(&path).unwrap_or_default();
        chunks.extend(chunk_text(&rel_str, &body, config.chunking.max_tokens));
    }

    tracing::info!(chunk_count = chunks.len(), "loaded corpus");
    Ok(chunks)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
