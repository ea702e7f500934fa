use ragdb_core::text_util::{truncate_with_ellipsis, CONTEXT_CONTENT_CHARS, EXCERPT_CHARS};
use ragdb_core::types::{Citation, ScoredResult};

const PREAMBLE: &str = "Based on the following context, please answer the query. \
Use the provided information to give accurate and contextual responses.";

const CLOSING: &str = "Instructions: Please provide a comprehensive answer based on the context above. \
If the context doesn't contain sufficient information to answer the query, \
please indicate what additional information would be needed.";

/// Turns ranked context documents into a single prompt plus citations.
pub struct ContextAssembler;

impl ContextAssembler {
    /// Sections keep input order. With no context the prompt is a fixed note
    /// and no citations are produced, whatever `include_sources` says.
    pub fn build_prompt(query: &str, context: &[ScoredResult], include_sources: bool) -> (String, Vec<Citation>) {
        if context.is_empty() {
            return (format!("Query: {query}\n\nNote: No relevant context found in the knowledge base."), vec![]);
        }
        let sections: Vec<String> = context
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "Context {}: [{}]\n{}",
                    i + 1,
                    hit.document.title,
                    truncate_with_ellipsis(&hit.document.content, CONTEXT_CONTENT_CHARS)
                )
            })
            .collect();
        let prompt = format!("{PREAMBLE}\n\n{}\n\nQuery: {query}\n\n{CLOSING}", sections.join("\n\n"));
        let citations = if include_sources { context.iter().map(Self::citation).collect() } else { vec![] };
        (prompt, citations)
    }

    pub fn citation(hit: &ScoredResult) -> Citation {
        Citation {
            id: hit.document.id.clone(),
            title: hit.document.title.clone(),
            category: hit.document.category.clone(),
            score: hit.score,
            excerpt: truncate_with_ellipsis(&hit.document.content, EXCERPT_CHARS),
        }
    }
}
