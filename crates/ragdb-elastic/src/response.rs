//! Decoding of Elasticsearch response bodies.
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use ragdb_core::error::{Error, Result};
use ragdb_core::types::{BackendHealth, BulkReport, Document, IndexStats, ScoredResult};

#[derive(Debug, Deserialize)]
struct SearchBody {
    hits: HitList,
}

#[derive(Debug, Deserialize)]
struct HitList {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct GetBody {
    #[serde(rename = "_id")]
    id: String,
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

fn to_document(id: String, source: Value) -> Result<Document> {
    let mut doc: Document =
        serde_json::from_value(source).map_err(|e| Error::backend(format!("malformed document {id}: {e}")))?;
    if doc.id.is_empty() {
        doc.id = id;
    }
    Ok(doc)
}

/// Hits in response order. The stored `id` wins; `_id` fills in when absent.
pub fn parse_hits(body: Value) -> Result<Vec<ScoredResult>> {
    let parsed: SearchBody =
        serde_json::from_value(body).map_err(|e| Error::backend(format!("unexpected search response: {e}")))?;
    parsed
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let score = hit.score.unwrap_or(0.0);
            Ok(ScoredResult { document: to_document(hit.id, hit.source)?, score })
        })
        .collect()
}

pub fn parse_get(body: Value) -> Result<Option<Document>> {
    let parsed: GetBody =
        serde_json::from_value(body).map_err(|e| Error::backend(format!("unexpected get response: {e}")))?;
    match (parsed.found, parsed.source) {
        (true, Some(source)) => to_document(parsed.id, source).map(Some),
        _ => Ok(None),
    }
}

pub fn parse_stats(body: &Value, index: &str) -> Result<IndexStats> {
    let total = body
        .pointer(&format!("/indices/{index}/total"))
        .ok_or_else(|| Error::backend(format!("no stats for index {index}")))?;
    Ok(IndexStats {
        doc_count: total.pointer("/docs/count").and_then(Value::as_u64).unwrap_or(0),
        size_bytes: total.pointer("/store/size_in_bytes").and_then(Value::as_u64).unwrap_or(0),
    })
}

pub fn parse_health(body: &Value) -> BackendHealth {
    BackendHealth {
        reachable: true,
        cluster_status: body.get("status").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        number_of_nodes: body.get("number_of_nodes").and_then(Value::as_u64).unwrap_or(0) as u32,
        active_shards: body.get("active_shards").and_then(Value::as_u64).unwrap_or(0) as u32,
    }
}

/// Per-item outcome of a `_bulk` call; items carrying an `error` count as failed.
pub fn parse_bulk(body: &Value) -> BulkReport {
    let mut report = BulkReport::default();
    let items = body.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    for item in items {
        let Some(action) = item.get("index") else { continue };
        let id = action.get("_id").and_then(Value::as_str).unwrap_or("").to_string();
        if let Some(err) = action.get("error") {
            warn!("bulk item {} failed: {}", id, error_reason(err));
            report.failed += 1;
        } else {
            report.indexed += 1;
            report.ids.push(id);
        }
    }
    report
}

/// Best-effort human reason from an Elasticsearch error payload.
pub fn error_reason(body: &Value) -> String {
    let err = body.get("error").unwrap_or(body);
    match (err.get("type").and_then(Value::as_str), err.get("reason").and_then(Value::as_str)) {
        (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
        (None, Some(reason)) => reason.to_string(),
        _ => err.to_string(),
    }
}
