use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    BackendHealth, BulkReport, Document, HybridQuery, IndexStats, ScoredResult, TextQuery, VectorQuery,
};

/// Text-to-vector model. Implementations are CPU bound and synchronous.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn model_name(&self) -> &str;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Document store with vector, lexical and hybrid retrieval.
///
/// Search methods return hits in the backend's own descending score order.
/// Infrastructure failures are `Error::BackendUnavailable`; a missing
/// document is `Ok(None)` / `Ok(false)`, never an error.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;
    fn index_name(&self) -> &str;

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredResult>>;
    async fn text_search(&self, query: &TextQuery) -> Result<Vec<ScoredResult>>;
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<ScoredResult>>;

    async fn get(&self, id: &str) -> Result<Option<Document>>;
    async fn index(&self, document: &Document) -> Result<String>;
    async fn index_batch(&self, documents: &[Document]) -> Result<BulkReport>;
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn stats(&self) -> Result<IndexStats>;
    async fn health(&self) -> Result<BackendHealth>;
    async fn ensure_index(&self, dimension: usize, force_recreate: bool) -> Result<()>;
}
