use ragdb_core::types::{Document, ScoredResult};
use ragdb_query::ContextAssembler;

fn hit(id: &str, title: &str, content: &str, score: f32) -> ScoredResult {
    ScoredResult {
        document: Document {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: "science".into(),
            tags: vec![],
            metadata: Default::default(),
            embedding: None,
            created_at: None,
            updated_at: None,
        },
        score,
    }
}

#[test]
fn empty_context_yields_fixed_note_and_no_sources() {
    for include_sources in [true, false] {
        let (prompt, sources) = ContextAssembler::build_prompt("what is rust?", &[], include_sources);
        assert_eq!(prompt, "Query: what is rust?\n\nNote: No relevant context found in the knowledge base.");
        assert!(sources.is_empty());
    }
}

#[test]
fn prompt_lists_sections_in_order_between_fixed_text() {
    let context = [hit("a", "First", "alpha body", 0.9), hit("b", "Second", "beta body", 0.8)];
    let (prompt, sources) = ContextAssembler::build_prompt("compare them", &context, true);

    let expected = "Based on the following context, please answer the query. Use the provided information to give accurate and contextual responses.\n\n\
Context 1: [First]\nalpha body\n\n\
Context 2: [Second]\nbeta body\n\n\
Query: compare them\n\n\
Instructions: Please provide a comprehensive answer based on the context above. If the context doesn't contain sufficient information to answer the query, please indicate what additional information would be needed.";
    assert_eq!(prompt, expected);

    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, "a");
    assert_eq!(sources[1].title, "Second");
    assert_eq!(sources[1].category, "science");
    assert!((sources[1].score - 0.8).abs() < 1e-6);
    assert_eq!(sources[0].excerpt, "alpha body");
}

#[test]
fn sources_are_omitted_on_request() {
    let (prompt, sources) = ContextAssembler::build_prompt("q", &[hit("a", "T", "c", 0.5)], false);
    assert!(prompt.contains("Context 1: [T]\nc"));
    assert!(sources.is_empty());
}

#[test]
fn context_and_excerpt_truncation_boundaries() {
    let exact = "y".repeat(800);
    let over = "z".repeat(801);
    let context = [hit("exact", "E", &exact, 0.9), hit("over", "O", &over, 0.8)];
    let (prompt, sources) = ContextAssembler::build_prompt("q", &context, true);

    assert!(prompt.contains(&format!("Context 1: [E]\n{exact}\n\n")));
    assert!(prompt.contains(&format!("Context 2: [O]\n{}...\n\n", "z".repeat(800))));

    assert_eq!(sources[0].excerpt, format!("{}...", "y".repeat(200)));
    let short = ContextAssembler::citation(&hit("s", "S", &"w".repeat(200), 0.1));
    assert_eq!(short.excerpt, "w".repeat(200));
}
