use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::filter::Predicate;
use ragdb_core::fusion::{cosine_similarity, knn_score, FusionWeights};
use ragdb_core::traits::SearchBackend;
use ragdb_core::types::{
    BackendHealth, BulkReport, Document, HybridQuery, IndexStats, ScoredResult, TextQuery, VectorQuery,
};

use crate::lexical::LexicalIndex;
use crate::predicate;

pub struct LocalBackend {
    index_name: String,
    dimension: RwLock<Option<usize>>,
    docs: RwLock<BTreeMap<String, Document>>,
    lexical: LexicalIndex,
}

impl LocalBackend {
    pub fn new(index_name: impl Into<String>) -> Result<Self> {
        let lexical = LexicalIndex::in_memory().map_err(Error::backend)?;
        Ok(Self {
            index_name: index_name.into(),
            dimension: RwLock::new(None),
            docs: RwLock::new(BTreeMap::new()),
            lexical,
        })
    }

    fn read_docs(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Document>>> {
        self.docs.read().map_err(|_| Error::backend("document store lock poisoned"))
    }

    fn write_docs(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Document>>> {
        self.docs.write().map_err(|_| Error::backend("document store lock poisoned"))
    }

    fn check_document(&self, doc: &Document) -> Result<()> {
        if doc.id.trim().is_empty() {
            return Err(Error::Validation("document id must not be empty".into()));
        }
        let expected = *self.dimension.read().map_err(|_| Error::backend("dimension lock poisoned"))?;
        if let (Some(expected), Some(vector)) = (expected, doc.embedding.as_ref()) {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        Ok(())
    }

    fn lexical_scores(&self, text: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        self.lexical.search(text, limit).map_err(Error::backend)
    }
}

fn admits(filter: &Option<Predicate>, doc: &Document) -> bool {
    filter.as_ref().map_or(true, |p| predicate::matches(p, doc))
}

fn hit(doc: &Document, score: f32) -> ScoredResult {
    ScoredResult { document: doc.clone().without_embedding(), score }
}

#[async_trait]
impl SearchBackend for LocalBackend {
    fn name(&self) -> &str { "local" }
    fn index_name(&self) -> &str { &self.index_name }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredResult>> {
        let docs = self.read_docs()?;
        let mut scored: Vec<(&Document, f32)> = docs
            .values()
            .filter(|d| admits(&query.filter, d))
            .filter_map(|d| d.embedding.as_ref().map(|e| (d, knn_score(&query.vector, e))))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.k);
        debug!("local knn: {} hits (k={})", scored.len(), query.k);
        Ok(scored.into_iter().map(|(d, s)| hit(d, s)).collect())
    }

    async fn text_search(&self, query: &TextQuery) -> Result<Vec<ScoredResult>> {
        let docs = self.read_docs()?;
        let ranked = self.lexical_scores(&query.text, docs.len())?;
        let hits: Vec<ScoredResult> = ranked
            .into_iter()
            .filter_map(|(id, score)| docs.get(&id).map(|d| (d, score)))
            .filter(|(d, _)| admits(&query.filter, d))
            .take(query.k)
            .map(|(d, s)| hit(d, s))
            .collect();
        debug!("local text: {} hits (k={})", hits.len(), query.k);
        Ok(hits)
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<ScoredResult>> {
        let docs = self.read_docs()?;
        let lexical: HashMap<String, f32> = self.lexical_scores(&query.text, docs.len())?.into_iter().collect();
        let weights = FusionWeights::new(query.text_weight, query.vector_weight);
        let candidates = docs.values().filter(|d| admits(&query.filter, d)).map(|d| {
            let text_score = lexical.get(&d.id).copied().unwrap_or(0.0);
            let cosine = d.embedding.as_deref().map_or(0.0, |e| cosine_similarity(&query.vector, e));
            (d, text_score, cosine)
        });
        let mut fused = weights.fuse(candidates, query.min_score);
        fused.truncate(query.size);
        debug!("local hybrid: {} hits (size={})", fused.len(), query.size);
        Ok(fused.into_iter().map(|(d, s)| hit(d, s)).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read_docs()?.get(id).cloned())
    }

    async fn index(&self, document: &Document) -> Result<String> {
        self.check_document(document)?;
        self.lexical.upsert(std::slice::from_ref(document)).map_err(Error::backend)?;
        self.write_docs()?.insert(document.id.clone(), document.clone());
        Ok(document.id.clone())
    }

    async fn index_batch(&self, documents: &[Document]) -> Result<BulkReport> {
        let mut accepted = Vec::with_capacity(documents.len());
        let mut report = BulkReport::default();
        for doc in documents {
            match self.check_document(doc) {
                Ok(()) => accepted.push(doc.clone()),
                Err(e) => {
                    warn!("rejecting document {:?}: {}", doc.id, e);
                    report.failed += 1;
                }
            }
        }
        self.lexical.upsert(&accepted).map_err(Error::backend)?;
        let mut docs = self.write_docs()?;
        for doc in accepted {
            report.ids.push(doc.id.clone());
            report.indexed += 1;
            docs.insert(doc.id.clone(), doc);
        }
        Ok(report)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.write_docs()?.remove(id).is_some();
        if removed {
            self.lexical.remove(id).map_err(Error::backend)?;
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let docs = self.read_docs()?;
        let size_bytes = docs
            .values()
            .map(|d| d.title.len() + d.content.len() + d.embedding.as_ref().map_or(0, |e| e.len() * 4))
            .sum::<usize>();
        Ok(IndexStats { doc_count: docs.len() as u64, size_bytes: size_bytes as u64 })
    }

    async fn health(&self) -> Result<BackendHealth> {
        Ok(BackendHealth {
            reachable: true,
            cluster_status: "green".into(),
            number_of_nodes: 1,
            active_shards: 1,
        })
    }

    async fn ensure_index(&self, dimension: usize, force_recreate: bool) -> Result<()> {
        if force_recreate {
            self.write_docs()?.clear();
            self.lexical.clear().map_err(Error::backend)?;
            info!("Recreated local index {}", self.index_name);
        }
        *self.dimension.write().map_err(|_| Error::backend("dimension lock poisoned"))? = Some(dimension);
        Ok(())
    }
}
