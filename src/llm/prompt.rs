//! Prompt construction for the generation service.
//!
//! Three shapes, chosen by the caller rather than inferred: a no-context
//! prompt for queries where retrieval surfaced nothing relevant, a grounded
//! prompt carrying the selected chunks, and structured variants (list,
//! table) that layer formatting instructions on the grounded shape.

use crate::models::Chunk;

/// Separator between chunks in the grounded context block.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Upper bound on context characters shipped to the model.
pub const MAX_CONTEXT_CHARS: usize = 3000;

/// The prompt shapes a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptShape {
    NoContext,
    Grounded,
    List,
    Table,
}

/// Join chunk contents with the context delimiter, truncated to
/// [`MAX_CONTEXT_CHARS`]. Returns `None` when there are no chunks.
pub fn format_context(chunks: &[Chunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }

    let combined = chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    if combined.chars().count() > MAX_CONTEXT_CHARS {
        let truncated: String = combined.chars().take(MAX_CONTEXT_CHARS).collect();
        Some(format!("{truncated}..."))
    } else {
        Some(combined)
    }
}

/// Build the final prompt for a question.
///
/// `context` must be `Some` for the grounded shapes; passing `None`
/// silently downgrades to the no-context shape so a degraded retrieval
/// can never produce a prompt that claims to have context.
pub fn build_prompt(question: &str, context: Option<&str>, shape: PromptShape) -> String {
    let Some(context) = context else {
        return no_context_prompt(question);
    };

    match shape {
        PromptShape::NoContext => no_context_prompt(question),
        PromptShape::Grounded => grounded_prompt(question, context, None),
        PromptShape::List => grounded_prompt(
            question,
            context,
            Some("Format the answer as a bulleted list of the key points."),
        ),
        PromptShape::Table => grounded_prompt(
            question,
            context,
            Some(
                "Format the answer as a markdown table with one row per item \
                 and clearly labeled columns.",
            ),
        ),
    }
}

fn no_context_prompt(question: &str) -> String {
    format!(
        "You are a helpful AI assistant. No document context is available \
         for this question. Answer from general knowledge if you can do so \
         reliably; otherwise say that you cannot answer without specific \
         knowledge of the user's documents.\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

fn grounded_prompt(question: &str, context: &str, formatting: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a helpful AI assistant that answers questions based on the \
         provided context. Answer using only the context below. If the \
         context is insufficient to answer, say so explicitly.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n"
    );

    if let Some(instructions) = formatting {
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Answer based on the context above:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> Chunk {
        Chunk {
            id: "c".to_string(),
            document_id: "d".to_string(),
            chunk_index: 0,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_format_context_joins_with_delimiter() {
        let context = format_context(&[chunk("alpha"), chunk("beta")]).unwrap();
        assert_eq!(context, "alpha\n\n---\n\nbeta");
    }

    #[test]
    fn test_format_context_empty_is_none() {
        assert!(format_context(&[]).is_none());
    }

    #[test]
    fn test_format_context_truncates() {
        let long = "x".repeat(4000);
        let context = format_context(&[chunk(&long)]).unwrap();
        assert_eq!(context.chars().count(), MAX_CONTEXT_CHARS + 3);
        assert!(context.ends_with("..."));
    }

    #[test]
    fn test_no_context_shape() {
        let prompt = build_prompt("What is the refund policy?", None, PromptShape::Grounded);
        assert!(prompt.contains("No document context is available"));
        assert!(prompt.contains("What is the refund policy?"));
    }

    #[test]
    fn test_grounded_shape_carries_context() {
        let prompt = build_prompt(
            "refund policy",
            Some("Refunds are processed within 30 days"),
            PromptShape::Grounded,
        );
        assert!(prompt.contains("Refunds are processed within 30 days"));
        assert!(prompt.contains("only the context below"));
    }

    #[test]
    fn test_structured_shapes_add_formatting() {
        let list = build_prompt("q", Some("ctx"), PromptShape::List);
        assert!(list.contains("bulleted list"));

        let table = build_prompt("q", Some("ctx"), PromptShape::Table);
        assert!(table.contains("markdown table"));
    }
}
