use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use ragdb_core::config::Settings;
use ragdb_core::error::Result;
use ragdb_core::filter::{FilterNormalizer, Predicate};
use ragdb_core::fusion::FusionWeights;
use ragdb_core::text_util::{truncate_with_ellipsis, RESULT_CONTENT_CHARS};
use ragdb_core::traits::{Embedder, SearchBackend};
use ragdb_core::types::{
    HybridQuery, RagRequest, RagResponse, ScoredResult, SearchQuery, SearchResponse, SearchResult, SearchType,
    TextQuery, VectorQuery,
};

use crate::call::{bounded, check_dimension, embed_one};
use crate::context::ContextAssembler;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub dimension: usize,
    pub weights: FusionWeights,
    /// `num_candidates = k * candidate_factor` for nearest-neighbour requests.
    pub candidate_factor: usize,
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            weights: FusionWeights::default(),
            candidate_factor: 2,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dimension: settings.embedding.dimension,
            weights: settings.search.weights(),
            candidate_factor: settings.search.candidate_factor.max(1),
            request_timeout: settings.search.request_timeout(),
        }
    }
}

/// Candidates requested from the backend for a page of `max_results`.
pub fn candidate_count(max_results: usize) -> usize {
    max_results.saturating_mul(2).max(max_results)
}

/// Drops hits under `min_score` and caps the rest, keeping backend order.
pub fn apply_cutoff(hits: Vec<ScoredResult>, min_score: f32, max_results: usize) -> Vec<ScoredResult> {
    hits.into_iter().filter(|h| h.score >= min_score).take(max_results).collect()
}

fn to_search_result(hit: ScoredResult) -> SearchResult {
    let doc = hit.document;
    SearchResult {
        content: truncate_with_ellipsis(&doc.content, RESULT_CONTENT_CHARS),
        id: doc.id,
        title: doc.title,
        category: doc.category,
        tags: doc.tags,
        score: hit.score,
        metadata: doc.metadata,
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

pub struct SearchOrchestrator {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn SearchBackend>,
    config: OrchestratorConfig,
}

impl SearchOrchestrator {
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn SearchBackend>, config: OrchestratorConfig) -> Self {
        Self { embedder, backend, config }
    }

    pub fn config(&self) -> &OrchestratorConfig { &self.config }

    /// Runs one search. Validation precedes any embedding or backend call;
    /// any collaborator failure aborts the request without partial results.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let start = Instant::now();
        query.validate()?;
        let filter = query.filters.as_ref().and_then(FilterNormalizer::normalize);
        let hits = self
            .retrieve(&query.query, query.search_type, query.max_results, query.min_score, filter)
            .await?;
        let results: Vec<SearchResult> = hits.into_iter().map(to_search_result).collect();
        let elapsed_ms = elapsed_ms(start);
        info!(
            "{} search {:?} -> {} results in {:.1} ms",
            query.search_type,
            query.query,
            results.len(),
            elapsed_ms
        );
        Ok(SearchResponse {
            query: query.query.clone(),
            total_results: results.len(),
            search_type: query.search_type,
            results,
            elapsed_ms,
        })
    }

    /// Vector retrieval of up to `max_context` documents, then prompt assembly.
    pub async fn rag_query(&self, request: &RagRequest) -> Result<RagResponse> {
        let start = Instant::now();
        request.validate()?;
        let context = self
            .retrieve(&request.query, SearchType::Vector, request.max_context, request.min_score, None)
            .await?;
        let (enhanced_prompt, context_sources) =
            ContextAssembler::build_prompt(&request.query, &context, request.include_sources);
        let elapsed_ms = elapsed_ms(start);
        info!("rag query {:?} -> {} context documents in {:.1} ms", request.query, context.len(), elapsed_ms);
        Ok(RagResponse { original_query: request.query.clone(), enhanced_prompt, context_sources, elapsed_ms })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = embed_one(&self.embedder, text).await?;
        check_dimension(self.config.dimension, &vector)?;
        Ok(vector)
    }

    async fn retrieve(
        &self,
        text: &str,
        search_type: SearchType,
        max_results: usize,
        min_score: f32,
        filter: Option<Predicate>,
    ) -> Result<Vec<ScoredResult>> {
        let k = candidate_count(max_results);
        let timeout = self.config.request_timeout;
        let hits = match search_type {
            SearchType::Vector => {
                let vector = self.embed_query(text).await?;
                let request = VectorQuery {
                    vector,
                    k,
                    num_candidates: k.saturating_mul(self.config.candidate_factor),
                    filter,
                };
                debug!("knn request k={} num_candidates={}", request.k, request.num_candidates);
                bounded(timeout, self.backend.vector_search(&request)).await?
            }
            SearchType::Text => {
                let request = TextQuery { text: text.to_string(), k, filter };
                debug!("text request k={}", request.k);
                bounded(timeout, self.backend.text_search(&request)).await?
            }
            SearchType::Hybrid => {
                let vector = self.embed_query(text).await?;
                let request = HybridQuery {
                    text: text.to_string(),
                    vector,
                    text_weight: self.config.weights.text_weight,
                    vector_weight: self.config.weights.vector_weight,
                    min_score,
                    size: k,
                    filter,
                };
                debug!("hybrid request size={} min_score={}", request.size, request.min_score);
                bounded(timeout, self.backend.hybrid_search(&request)).await?
            }
        };
        Ok(apply_cutoff(hits, min_score, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_fetch_is_at_least_double() {
        assert_eq!(candidate_count(10), 20);
        assert_eq!(candidate_count(1), 2);
        assert_eq!(candidate_count(usize::MAX), usize::MAX);
    }
}
