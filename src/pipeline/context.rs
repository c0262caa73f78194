//! Bounded prompt assembly.

use crate::types::Chunk;

/// Assemble the generation prompt from retrieved chunks and the user's
/// question, under a character budget.
///
/// Chunks are appended in rank order; the first chunk that would push
/// the context past `max_context_chars` stops inclusion (no partial
/// chunks). An empty selection still produces a valid prompt — the
/// model answers from the question alone.
pub(crate) fn assemble_prompt(query: &str, chunks: &[Chunk], max_context_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        let len = chunk.text.chars().count();
        if used + len > max_context_chars {
            break;
        }
        used += len;
        let label = chunk.source.as_deref().unwrap_or(&chunk.id);
        context.push_str(&format!("[{n}] ({label})\n{text}\n\n", n = i + 1, text = chunk.text));
    }

    format!(
        "Answer the question using only the context below. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n{context}\n\
         Question: {query}\n\
         Answer:"
    )
}
