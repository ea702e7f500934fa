//! Domain types shared by the backends, the orchestrator and the CLI.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::{Filters, Predicate};

pub type DocId = String;
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub const MAX_RESULTS_LIMIT: usize = 100;
pub const MAX_CONTEXT_LIMIT: usize = 10;
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MIN_SCORE: f32 = 0.7;
pub const DEFAULT_MAX_CONTEXT: usize = 3;

/// A document as stored by the search backend.
///
/// - `id`: opaque unique identifier
/// - `category`: single keyword classification
/// - `tags`: keyword set, order irrelevant
/// - `metadata`: open-ended, values validated only where they are used
/// - `embedding`: absent when the backend was asked not to return it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: DocId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Text fed to the embedder when a document is indexed.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    pub fn without_embedding(mut self) -> Self {
        self.embedding = None;
        self
    }
}

/// One document snapshot plus the score the backend gave it for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub document: Document,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Vector,
    Text,
    Hybrid,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Vector => "vector",
            SearchType::Text => "text",
            SearchType::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(SearchType::Vector),
            "text" => Ok(SearchType::Text),
            "hybrid" => Ok(SearchType::Hybrid),
            other => Err(Error::Validation(format!(
                "unknown search type '{other}' (expected vector, text or hybrid)"
            ))),
        }
    }
}

fn default_max_results() -> usize { DEFAULT_MAX_RESULTS }
fn default_min_score() -> f32 { DEFAULT_MIN_SCORE }
fn default_max_context() -> usize { DEFAULT_MAX_CONTEXT }
fn default_true() -> bool { true }

fn check_min_score(min_score: f32) -> Result<()> {
    if min_score.is_nan() || !(0.0..=1.0).contains(&min_score) {
        return Err(Error::Validation(format!("min_score must be within 0.0..=1.0, got {min_score}")));
    }
    Ok(())
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::Validation(format!("malformed {what}: {e}")))
}

/// Request-scoped search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub search_type: SearchType,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
            min_score: DEFAULT_MIN_SCORE,
            filters: None,
            search_type: SearchType::default(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        parse_json(raw, "search request")
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self { self.max_results = max_results; self }
    pub fn with_min_score(mut self, min_score: f32) -> Self { self.min_score = min_score; self }
    pub fn with_search_type(mut self, search_type: SearchType) -> Self { self.search_type = search_type; self }
    pub fn with_filters(mut self, filters: Filters) -> Self { self.filters = Some(filters); self }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results) {
            return Err(Error::Validation(format!(
                "max_results must be within 1..={MAX_RESULTS_LIMIT}, got {}",
                self.max_results
            )));
        }
        check_min_score(self.min_score)?;
        if let Some(filters) = &self.filters {
            if let Some(field) = filters.keys().find(|k| k.trim().is_empty()) {
                return Err(Error::Validation(format!("filter field name must not be empty: '{field}'")));
            }
        }
        Ok(())
    }
}

/// Request-scoped RAG parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagRequest {
    pub query: String,
    #[serde(default = "default_max_context")]
    pub max_context: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_true")]
    pub include_sources: bool,
}

impl RagRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_context: DEFAULT_MAX_CONTEXT,
            min_score: DEFAULT_MIN_SCORE,
            include_sources: true,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        parse_json(raw, "rag request")
    }

    pub fn with_max_context(mut self, max_context: usize) -> Self { self.max_context = max_context; self }
    pub fn with_min_score(mut self, min_score: f32) -> Self { self.min_score = min_score; self }
    pub fn with_sources(mut self, include_sources: bool) -> Self { self.include_sources = include_sources; self }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONTEXT_LIMIT).contains(&self.max_context) {
            return Err(Error::Validation(format!(
                "max_context must be within 1..={MAX_CONTEXT_LIMIT}, got {}",
                self.max_context
            )));
        }
        check_min_score(self.min_score)
    }
}

/// A search hit as handed to callers: no embedding, content possibly truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocId,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub score: f32,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub search_type: SearchType,
    pub results: Vec<SearchResult>,
    #[serde(rename = "execution_time_ms")]
    pub elapsed_ms: f64,
}

/// Provenance entry for one context document of a RAG prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: DocId,
    pub title: String,
    pub category: String,
    pub score: f32,
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub original_query: String,
    pub enhanced_prompt: String,
    pub context_sources: Vec<Citation>,
    #[serde(rename = "execution_time_ms")]
    pub elapsed_ms: f64,
}

/// Nearest-neighbour request. `k` is already over-fetched by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub k: usize,
    pub num_candidates: usize,
    pub filter: Option<Predicate>,
}

/// Lexical-only request over `title^2` and `content`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub k: usize,
    pub filter: Option<Predicate>,
}

/// Fused lexical + cosine request; `min_score` applies to the combined score.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub text: String,
    pub vector: Vec<f32>,
    pub text_weight: f32,
    pub vector_weight: f32,
    pub min_score: f32,
    pub size: usize,
    pub filter: Option<Predicate>,
}

/// Input for adding a document; the embedding is computed on ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub id: Option<DocId>,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl NewDocument {
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedDocument {
    pub id: DocId,
    pub title: String,
    pub category: String,
    pub status: String,
    pub embedding_dimension: usize,
}

/// A stored document as returned by a lookup; the vector itself is withheld.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub has_embedding: bool,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        let has_embedding = document.embedding.is_some();
        Self { document: document.without_embedding(), has_embedding }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub doc_count: u64,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub reachable: bool,
    pub cluster_status: String,
    pub number_of_nodes: u32,
    pub active_shards: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub indexed: usize,
    pub failed: usize,
    pub ids: Vec<DocId>,
}
