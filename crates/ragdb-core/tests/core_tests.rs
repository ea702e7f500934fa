use std::fs;
use tempfile::TempDir;

use ragdb_core::data_loader::{DocumentLoader, LoaderConfig};
use ragdb_core::filter::{FilterNormalizer, FilterValue, Filters, Predicate, Scalar};
use ragdb_core::text_util::{truncate_with_ellipsis, CONTEXT_CONTENT_CHARS, EXCERPT_CHARS, RESULT_CONTENT_CHARS};
use ragdb_core::types::{RagRequest, SearchQuery, SearchType};

#[test]
fn load_directory_reads_arrays_objects_and_jsonl() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(
        dir.join("a.json"),
        r#"[{"title":"A1","content":"alpha","category":"tech"},{"title":"A2","content":"beta","category":"tech","tags":["x"]}]"#,
    )
    .unwrap();
    fs::write(dir.join("b.json"), r#"{"title":"B","content":"gamma","category":"science"}"#).unwrap();
    fs::write(
        dir.join("c.jsonl"),
        "{\"title\":\"C1\",\"content\":\"delta\",\"category\":\"business\"}\n\n{\"title\":\"C2\",\"content\":\"eps\",\"category\":\"business\"}\n",
    )
    .unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");
    let titles: Vec<&str> = docs.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["A1", "A2", "B", "C1", "C2"], "sorted by file, then by position");
    assert_eq!(docs[1].tags, vec!["x".to_string()]);
}

#[test]
fn load_directory_limited_and_category_fallback() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("science")).unwrap();
    fs::write(dir.join("science/a.json"), r#"{"title":"A","content":"alpha","category":""}"#).unwrap();
    fs::write(dir.join("science/b.json"), r#"{"title":"B","content":"beta","category":""}"#).unwrap();

    let docs = DocumentLoader::new().load_directory_limited(dir, 1).expect("load limited");
    assert_eq!(docs.len(), 1, "limited to one source file");
    assert_eq!(docs[0].category, "science", "empty category falls back to the parent directory");

    let loader = DocumentLoader::with_config(LoaderConfig { fallback_category: Some("misc".into()) });
    let docs = loader.load_directory(dir).expect("load");
    assert!(docs.iter().all(|d| d.category == "misc"));
}

#[test]
fn load_file_reports_malformed_records() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.jsonl");
    fs::write(&path, "{\"title\":\"ok\",\"content\":\"c\",\"category\":\"x\"}\n{\"title\":1}\n").unwrap();
    let err = DocumentLoader::new().load_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.jsonl:2"), "{err:#}");
}

#[test]
fn search_query_bounds_are_enforced() {
    assert!(SearchQuery::new("q").validate().is_ok());
    assert!(SearchQuery::new("q").with_max_results(0).validate().is_err());
    assert!(SearchQuery::new("q").with_max_results(101).validate().is_err());
    assert!(SearchQuery::new("q").with_max_results(100).validate().is_ok());
    assert!(SearchQuery::new("q").with_min_score(1.5).validate().is_err());
    assert!(SearchQuery::new("q").with_min_score(-0.1).validate().is_err());
    assert!(SearchQuery::new("q").with_min_score(f32::NAN).validate().is_err());

    let mut filters = Filters::new();
    filters.insert(" ".into(), FilterValue::one("x"));
    let err = SearchQuery::new("q").with_filters(filters).validate().unwrap_err();
    assert_eq!(err.status_code(), 422);
}

#[test]
fn rag_request_bounds_are_enforced() {
    assert!(RagRequest::new("q").validate().is_ok());
    assert!(RagRequest::new("q").with_max_context(0).validate().is_err());
    assert!(RagRequest::new("q").with_max_context(11).validate().is_err());
    assert!(RagRequest::new("q").with_min_score(2.0).validate().is_err());
}

#[test]
fn search_query_json_defaults_and_errors() {
    let q = SearchQuery::from_json(r#"{"query":"machine learning"}"#).expect("parse");
    assert_eq!(q.max_results, 10);
    assert!((q.min_score - 0.7).abs() < 1e-6);
    assert_eq!(q.search_type, SearchType::Vector);
    assert!(q.filters.is_none());

    let q = SearchQuery::from_json(r#"{"query":"x","search_type":"hybrid","filters":{"category":"science"}}"#)
        .expect("parse");
    assert_eq!(q.search_type, SearchType::Hybrid);

    let err = SearchQuery::from_json(r#"{"max_results":-1,"min_score":1.5}"#).unwrap_err();
    assert_eq!(err.status_code(), 422);

    let err = SearchQuery::from_json(r#"{"query":"x","filters":{"category":{"nested":true}}}"#).unwrap_err();
    assert_eq!(err.status_code(), 422);

    let r = RagRequest::from_json(r#"{"query":"trends"}"#).expect("parse");
    assert_eq!(r.max_context, 3);
    assert!(r.include_sources);
}

#[test]
fn search_type_parses_case_insensitively() {
    assert_eq!("HYBRID".parse::<SearchType>().unwrap(), SearchType::Hybrid);
    assert_eq!(" text ".parse::<SearchType>().unwrap(), SearchType::Text);
    assert!("semantic".parse::<SearchType>().is_err());
}

#[test]
fn filter_normalization_is_independent_of_insertion_order() {
    let entries = [
        ("tags", FilterValue::any_of(["ai", "ml"])),
        ("category", FilterValue::one("technology")),
        ("metadata.language", FilterValue::one("en")),
        ("year", FilterValue::One(Scalar::Int(2024))),
    ];
    let mut forward = Filters::new();
    for (k, v) in entries.iter().cloned() {
        forward.insert(k.to_string(), v);
    }
    let mut backward = Filters::with_capacity(64);
    for (k, v) in entries.iter().rev().cloned() {
        backward.insert(k.to_string(), v);
    }

    let a = FilterNormalizer::normalize(&forward).expect("predicate");
    let b = FilterNormalizer::normalize(&backward).expect("predicate");
    assert_eq!(a, b);

    let Predicate::And(clauses) = a else { panic!("expected And") };
    let fields: Vec<&str> = clauses
        .iter()
        .map(|c| match c {
            Predicate::Equals { field, .. } | Predicate::In { field, .. } => field.as_str(),
            Predicate::And(_) => "",
        })
        .collect();
    assert_eq!(fields, vec!["category", "metadata.language", "tags", "year"]);
}

#[test]
fn empty_filter_list_adds_no_clause() {
    let mut filters = Filters::new();
    filters.insert("tags".into(), FilterValue::AnyOf(vec![]));
    assert_eq!(FilterNormalizer::normalize(&filters), None);

    filters.insert("category".into(), FilterValue::one("science"));
    assert_eq!(
        FilterNormalizer::normalize(&filters),
        Some(Predicate::Equals { field: "category".into(), value: Scalar::Str("science".into()) })
    );

    let raw = serde_json::json!({ "tags": [], "category": "science" });
    let parsed = FilterNormalizer::from_json(raw.as_object().unwrap()).unwrap();
    assert_eq!(parsed, FilterNormalizer::normalize(&filters));
}

#[test]
fn truncation_properties_hold_at_every_boundary() {
    for limit in [RESULT_CONTENT_CHARS, CONTEXT_CONTENT_CHARS, EXCERPT_CHARS] {
        for len in [0, 1, limit - 1, limit, limit + 1, limit * 3] {
            let input = "x".repeat(len);
            let out = truncate_with_ellipsis(&input, limit);
            assert!(out.chars().count() <= limit + 3);
            assert_eq!(out.ends_with("..."), len > limit, "limit={limit} len={len}");
            if len <= limit {
                assert_eq!(out, input);
            }
        }
    }
}
