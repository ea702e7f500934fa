//! Elasticsearch request bodies.
//!
//! Pure functions from query types to JSON so the wire shape can be tested
//! without a cluster.
use serde_json::{json, Map, Value};

use ragdb_core::filter::Predicate;
use ragdb_core::fusion::TITLE_BOOST;
use ragdb_core::types::{Document, HybridQuery, TextQuery, VectorQuery};

pub const EMBEDDING_FIELD: &str = "embedding";

/// Stored fields returned with every hit. The vector itself is never fetched.
pub const SOURCE_FIELDS: [&str; 8] =
    ["id", "title", "content", "category", "tags", "metadata", "created_at", "updated_at"];

/// Negative cosine is clamped to 0: script scores must not be negative.
pub const HYBRID_SCRIPT: &str =
    "Math.max(cosineSimilarity(params.query_vector, 'embedding'), 0) * params.vector_weight";

fn lexical_fields() -> Value {
    json!([format!("title^{TITLE_BOOST}"), "content"])
}

/// `term` for one value, `terms` for a set, `bool.must` for a conjunction.
pub fn predicate_clause(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::Equals { field, value } => json!({ "term": { field.as_str(): value.to_json() } }),
        Predicate::In { field, values } => {
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            json!({ "terms": { field.as_str(): values } })
        }
        Predicate::And(clauses) => {
            let must: Vec<Value> = clauses.iter().map(predicate_clause).collect();
            json!({ "bool": { "must": must } })
        }
    }
}

pub fn knn_body(query: &VectorQuery) -> Value {
    let mut knn = json!({
        "field": EMBEDDING_FIELD,
        "query_vector": query.vector,
        "k": query.k,
        "num_candidates": query.num_candidates,
    });
    if let Some(filter) = &query.filter {
        knn["filter"] = predicate_clause(filter);
    }
    json!({ "knn": knn, "size": query.k, "_source": SOURCE_FIELDS })
}

pub fn text_body(query: &TextQuery) -> Value {
    let mut boolean = Map::new();
    boolean.insert(
        "must".into(),
        json!([{ "multi_match": { "query": query.text, "fields": lexical_fields() } }]),
    );
    if let Some(filter) = &query.filter {
        boolean.insert("filter".into(), json!([predicate_clause(filter)]));
    }
    json!({ "query": { "bool": boolean }, "size": query.k, "_source": SOURCE_FIELDS })
}

pub fn hybrid_body(query: &HybridQuery) -> Value {
    let mut boolean = Map::new();
    boolean.insert(
        "should".into(),
        json!([
            {
                "multi_match": {
                    "query": query.text,
                    "fields": lexical_fields(),
                    "boost": query.text_weight,
                }
            },
            {
                "script_score": {
                    "query": { "match_all": {} },
                    "script": {
                        "source": HYBRID_SCRIPT,
                        "params": { "query_vector": query.vector, "vector_weight": query.vector_weight },
                    },
                }
            }
        ]),
    );
    boolean.insert("minimum_should_match".into(), json!(1));
    if let Some(filter) = &query.filter {
        boolean.insert("filter".into(), json!([predicate_clause(filter)]));
    }
    json!({
        "query": { "bool": boolean },
        "min_score": query.min_score,
        "size": query.size,
        "_source": SOURCE_FIELDS,
    })
}

/// Index definition: keyword identity fields, stop-filtered text fields, a
/// cosine `dense_vector` of the configured width, single shard.
pub fn index_mapping(dimension: usize) -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text", "analyzer": "standard" },
                "content": { "type": "text", "analyzer": "standard" },
                "category": { "type": "keyword" },
                "tags": { "type": "keyword" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" },
                "metadata": { "type": "object", "dynamic": true },
                "embedding": {
                    "type": "dense_vector",
                    "dims": dimension,
                    "index": true,
                    "similarity": "cosine",
                }
            }
        },
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "analyzer": {
                    "standard": { "tokenizer": "standard", "filter": ["lowercase", "stop"] }
                }
            }
        }
    })
}

/// Newline-delimited `_bulk` payload, one `index` action per document.
pub fn bulk_body(index: &str, documents: &[Document]) -> serde_json::Result<String> {
    let mut body = String::new();
    for doc in documents {
        body.push_str(&serde_json::to_string(&json!({ "index": { "_index": index, "_id": doc.id } }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}
