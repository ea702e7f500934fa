//! ragdb-elastic
//!
//! `SearchBackend` over the Elasticsearch REST API. Request bodies are built
//! in `dsl`, responses decoded in `response`.
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use ragdb_core::config::ElasticSettings;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::SearchBackend;
use ragdb_core::types::{
    BackendHealth, BulkReport, Document, HybridQuery, IndexStats, ScoredResult, TextQuery, VectorQuery,
};

pub mod dsl;
pub mod response;

pub struct ElasticBackend {
    client: Client,
    base: Url,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticBackend {
    pub fn new(settings: &ElasticSettings) -> Result<Self> {
        let base = Url::parse(&settings.url())
            .map_err(|e| Error::InvalidConfig(format!("elasticsearch url {}: {e}", settings.url())))?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .danger_accept_invalid_certs(!settings.verify_certs)
            .build()
            .map_err(Error::backend)?;
        info!("Elasticsearch backend at {} (index {})", base, settings.index);
        Ok(Self {
            client,
            base,
            index: settings.index.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    /// Joins path segments onto the base url, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, Value)> {
        let response = builder.send().await.map_err(Error::backend)?;
        let status = response.status();
        let text = response.text().await.map_err(Error::backend)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }

    async fn search(&self, kind: &str, body: Value) -> Result<Vec<ScoredResult>> {
        debug!("{} search body: {}", kind, body);
        let url = self.endpoint(&[self.index.as_str(), "_search"])?;
        let (status, body) = self.send(self.request(Method::POST, url).json(&body)).await?;
        if !status.is_success() {
            return Err(Error::backend(format!(
                "{kind} search failed ({status}): {}",
                response::error_reason(&body)
            )));
        }
        let hits = response::parse_hits(body)?;
        debug!("{} search returned {} hits", kind, hits.len());
        Ok(hits)
    }
}

fn fail(action: &str, status: StatusCode, body: &Value) -> Error {
    Error::backend(format!("{action} failed ({status}): {}", response::error_reason(body)))
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    fn name(&self) -> &str { "elasticsearch" }
    fn index_name(&self) -> &str { &self.index }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredResult>> {
        self.search("vector", dsl::knn_body(query)).await
    }

    async fn text_search(&self, query: &TextQuery) -> Result<Vec<ScoredResult>> {
        self.search("text", dsl::text_body(query)).await
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<ScoredResult>> {
        self.search("hybrid", dsl::hybrid_body(query)).await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let url = self.endpoint(&[self.index.as_str(), "_doc", id])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => response::parse_get(body),
            s => Err(fail("get", s, &body)),
        }
    }

    async fn index(&self, document: &Document) -> Result<String> {
        let url = self.endpoint(&[self.index.as_str(), "_doc", document.id.as_str()])?;
        let (status, body) = self.send(self.request(Method::PUT, url).json(document)).await?;
        if !status.is_success() {
            return Err(fail("index", status, &body));
        }
        let id = body.get("_id").and_then(Value::as_str).unwrap_or(&document.id).to_string();
        debug!("Indexed document {}", id);
        Ok(id)
    }

    async fn index_batch(&self, documents: &[Document]) -> Result<BulkReport> {
        if documents.is_empty() {
            return Ok(BulkReport::default());
        }
        let payload = dsl::bulk_body(&self.index, documents).map_err(Error::backend)?;
        let url = self.endpoint(&["_bulk"])?;
        let builder = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload);
        let (status, body) = self.send(builder).await?;
        if !status.is_success() {
            return Err(fail("bulk index", status, &body));
        }
        let report = response::parse_bulk(&body);
        if report.failed > 0 {
            warn!("Failed to index {} of {} documents", report.failed, documents.len());
        }
        info!("Bulk indexed {} documents into {}", report.indexed, self.index);
        Ok(report)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let url = self.endpoint(&[self.index.as_str(), "_doc", id])?;
        let (status, body) = self.send(self.request(Method::DELETE, url)).await?;
        match status {
            StatusCode::NOT_FOUND => {
                warn!("Document not found: {}", id);
                Ok(false)
            }
            s if s.is_success() => {
                info!("Deleted document: {}", id);
                Ok(true)
            }
            s => Err(fail("delete", s, &body)),
        }
    }

    async fn stats(&self) -> Result<IndexStats> {
        let url = self.endpoint(&[self.index.as_str(), "_stats"])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if !status.is_success() {
            return Err(fail("stats", status, &body));
        }
        response::parse_stats(&body, &self.index)
    }

    async fn health(&self) -> Result<BackendHealth> {
        let ping = self.endpoint(&[])?;
        match self.send(self.request(Method::GET, ping)).await {
            Ok((status, _)) if status.is_success() => {}
            Ok((status, body)) => return Err(fail("ping", status, &body)),
            Err(e) => {
                warn!("Elasticsearch ping failed: {}", e);
                return Ok(BackendHealth { cluster_status: "unreachable".into(), ..BackendHealth::default() });
            }
        }
        let url = self.endpoint(&["_cluster", "health"])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if !status.is_success() {
            return Err(fail("cluster health", status, &body));
        }
        Ok(response::parse_health(&body))
    }

    async fn ensure_index(&self, dimension: usize, force_recreate: bool) -> Result<()> {
        let url = self.endpoint(&[self.index.as_str()])?;
        let (status, _) = self.send(self.request(Method::HEAD, url.clone())).await?;
        if status.is_success() {
            if !force_recreate {
                info!("Index {} already exists", self.index);
                return Ok(());
            }
            info!("Deleting existing index: {}", self.index);
            let (status, body) = self.send(self.request(Method::DELETE, url.clone())).await?;
            if !status.is_success() {
                return Err(fail("delete index", status, &body));
            }
        }
        let (status, body) = self.send(self.request(Method::PUT, url).json(&dsl::index_mapping(dimension))).await?;
        if !status.is_success() {
            return Err(fail("create index", status, &body));
        }
        info!("Created index: {} (dims {})", self.index, dimension);
        Ok(())
    }
}
