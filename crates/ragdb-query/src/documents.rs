//! Document management: add, bulk ingest, get, delete, stats and health.
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{Embedder, SearchBackend};
use ragdb_core::types::{AddedDocument, BackendHealth, BulkReport, DocId, Document, DocumentView, NewDocument};

use crate::call::{bounded, check_dimension, embed_texts};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedDocument {
    pub id: DocId,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub index_name: String,
    pub document_count: u64,
    pub index_size_bytes: u64,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    pub name: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy` when the backend answered, `unhealthy` otherwise.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub backend: BackendHealth,
    pub embedding_model: EmbeddingInfo,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.backend.reachable
    }
}

pub struct DocumentService {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn SearchBackend>,
    dimension: usize,
    request_timeout: Duration,
}

impl DocumentService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn SearchBackend>,
        dimension: usize,
        request_timeout: Duration,
    ) -> Self {
        Self { embedder, backend, dimension, request_timeout }
    }

    fn build(&self, input: NewDocument, embedding: Vec<f32>, now: DateTime<Utc>) -> Document {
        let id = input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Document {
            id,
            title: input.title,
            content: input.content,
            category: input.category,
            tags: input.tags,
            metadata: input.metadata.unwrap_or_default(),
            embedding: Some(embedding),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    fn validate(input: &NewDocument) -> Result<()> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("document title must not be empty".into()));
        }
        if input.content.trim().is_empty() {
            return Err(Error::Validation("document content must not be empty".into()));
        }
        Ok(())
    }

    /// Embeds `"{title} {content}"` and indexes the document under a fresh
    /// UUID unless the input carries its own id.
    pub async fn add_document(&self, input: NewDocument) -> Result<AddedDocument> {
        Self::validate(&input)?;
        let mut vectors = embed_texts(&self.embedder, vec![input.embedding_text()]).await?;
        let embedding = vectors.pop().ok_or_else(|| Error::EmbeddingUnavailable("no vector returned".into()))?;
        check_dimension(self.dimension, &embedding)?;
        let embedding_dimension = embedding.len();
        let document = self.build(input, embedding, Utc::now());
        let id = bounded(self.request_timeout, self.backend.index(&document)).await?;
        info!("Added document: {}", id);
        Ok(AddedDocument {
            id,
            title: document.title,
            category: document.category,
            status: "indexed".into(),
            embedding_dimension,
        })
    }

    /// Embeds all documents in one batch and bulk-indexes them. Any invalid
    /// input or wrong-sized vector rejects the whole batch before indexing.
    pub async fn ingest(&self, inputs: Vec<NewDocument>) -> Result<BulkReport> {
        if inputs.is_empty() {
            return Ok(BulkReport::default());
        }
        for input in &inputs {
            Self::validate(input)?;
        }
        let texts: Vec<String> = inputs.iter().map(NewDocument::embedding_text).collect();
        let vectors = embed_texts(&self.embedder, texts).await?;
        for v in &vectors {
            check_dimension(self.dimension, v)?;
        }
        let now = Utc::now();
        let documents: Vec<Document> =
            inputs.into_iter().zip(vectors).map(|(input, v)| self.build(input, v, now)).collect();
        let report = bounded(self.request_timeout, self.backend.index_batch(&documents)).await?;
        if report.failed > 0 {
            warn!("Failed to index {} of {} documents", report.failed, documents.len());
        }
        info!("Ingested {} documents", report.indexed);
        Ok(report)
    }

    pub async fn get_document(&self, id: &str) -> Result<DocumentView> {
        match bounded(self.request_timeout, self.backend.get(id)).await? {
            Some(doc) => Ok(DocumentView::from(doc)),
            None => Err(Error::NotFound(format!("document {id}"))),
        }
    }

    pub async fn delete_document(&self, id: &str) -> Result<DeletedDocument> {
        if bounded(self.request_timeout, self.backend.delete(id)).await? {
            Ok(DeletedDocument { id: id.to_string(), status: "deleted".into() })
        } else {
            Err(Error::NotFound(format!("document {id}")))
        }
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        let stats = bounded(self.request_timeout, self.backend.stats()).await?;
        Ok(SystemStats {
            index_name: self.backend.index_name().to_string(),
            document_count: stats.doc_count,
            index_size_bytes: stats.size_bytes,
            embedding_model: self.embedder.model_name().to_string(),
            embedding_dimension: self.embedder.dim(),
            backend: self.backend.name().to_string(),
        })
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let backend = bounded(self.request_timeout, self.backend.health()).await?;
        let status = if backend.reachable { "healthy" } else { "unhealthy" };
        Ok(HealthReport {
            status: status.into(),
            timestamp: Utc::now(),
            backend,
            embedding_model: EmbeddingInfo {
                name: self.embedder.model_name().to_string(),
                dimension: self.embedder.dim(),
            },
        })
    }

    /// Creates the backend index sized for the configured embedding dimension.
    pub async fn ensure_index(&self, force_recreate: bool) -> Result<()> {
        bounded(self.request_timeout, self.backend.ensure_index(self.dimension, force_recreate)).await
    }
}
