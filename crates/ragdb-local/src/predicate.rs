//! In-process evaluation of normalized filter predicates.
//!
//! Field lookup follows keyword semantics: `tags` matches when any tag
//! matches, `metadata.<path>` walks the metadata object, unknown fields
//! never match.
use serde_json::Value;

use ragdb_core::filter::Predicate;
use ragdb_core::types::Document;

pub fn matches(predicate: &Predicate, doc: &Document) -> bool {
    match predicate {
        Predicate::Equals { field, value } => field_values(doc, field).iter().any(|v| value.matches_json(v)),
        Predicate::In { field, values } => field_values(doc, field)
            .iter()
            .any(|v| values.iter().any(|s| s.matches_json(v))),
        Predicate::And(clauses) => clauses.iter().all(|c| matches(c, doc)),
    }
}

fn field_values(doc: &Document, field: &str) -> Vec<Value> {
    match field {
        "id" => vec![Value::String(doc.id.clone())],
        "title" => vec![Value::String(doc.title.clone())],
        "content" => vec![Value::String(doc.content.clone())],
        "category" => vec![Value::String(doc.category.clone())],
        "tags" => doc.tags.iter().cloned().map(Value::String).collect(),
        other => match other.strip_prefix("metadata.") {
            Some(path) => {
                let mut current: Option<&Value> = None;
                for (i, key) in path.split('.').enumerate() {
                    current = if i == 0 { doc.metadata.get(key) } else { current.and_then(|v| v.get(key)) };
                }
                match current {
                    Some(Value::Array(items)) => items.clone(),
                    Some(v) => vec![v.clone()],
                    None => vec![],
                }
            }
            None => vec![],
        },
    }
}
