//! Paragraph-boundary text chunker.
//!
//! Collaborator shim standing in for the excluded ingestion service: splits
//! document body text into [`Chunk`]s on paragraph boundaries (`\n\n`),
//! respecting a `max_tokens` budget, so the CLI can hand the core the
//! well-formed chunks its contract expects.

use uuid::Uuid;

use crate::models::Chunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks on paragraph boundaries, respecting `max_tokens`.
/// Chunk indices are contiguous starting at 0; empty text yields no chunks.
pub fn chunk_text(document_id: &str, text: &str, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN).max(1);

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if !buffer.is_empty() && buffer.len() + 2 + paragraph.len() > max_chars {
            push_chunk(&mut chunks, document_id, &buffer);
            buffer.clear();
        }

        if paragraph.len() > max_chars {
            if !buffer.is_empty() {
                push_chunk(&mut chunks, document_id, &buffer);
                buffer.clear();
            }
            for piece in split_long_paragraph(paragraph, max_chars) {
                push_chunk(&mut chunks, document_id, piece);
            }
        } else {
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(paragraph);
        }
    }

    if !buffer.is_empty() {
        push_chunk(&mut chunks, document_id, &buffer);
    }

    chunks
}

/// Hard-split an oversized paragraph, preferring space boundaries.
fn split_long_paragraph(paragraph: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut remaining = paragraph;

    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            pieces.push(remaining);
            break;
        }

        let mut end = max_chars;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        let split_at = remaining[..end]
            .rfind(' ')
            .map(|pos| pos + 1)
            .unwrap_or(end);

        pieces.push(remaining[..split_at].trim_end());
        remaining = remaining[split_at..].trim_start();
    }

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn push_chunk(chunks: &mut Vec<Chunk>, document_id: &str, content: &str) {
    chunks.push(Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: chunks.len() as i64,
        content: content.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", 250);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].document_id, "doc1");
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("doc1", "", 250).is_empty());
        assert!(chunk_text("doc1", "\n\n  \n\n", 250).is_empty());
    }

    #[test]
    fn test_paragraphs_merge_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text("doc1", text, 250);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("First paragraph."));
        assert!(chunks[0].content.contains("Third paragraph."));
    }

    #[test]
    fn test_indices_contiguous_when_split() {
        // max_tokens=5 → max_chars=20, forcing splits
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text("doc1", text, 5);
        assert!(chunks.len() > 1);
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, position as i64);
        }
    }

    #[test]
    fn test_long_paragraph_splits_at_word_boundaries() {
        let text = "word ".repeat(100);
        let chunks = chunk_text("doc1", text.trim(), 5);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 20);
            assert!(!chunk.content.starts_with(' '));
            assert!(!chunk.content.ends_with(' '));
        }
    }
}
