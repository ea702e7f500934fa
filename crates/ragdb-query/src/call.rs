//! Guards around the two external collaborators: embedding runs on the
//! blocking pool, backend futures run under a deadline.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

/// Awaits `fut` for at most `limit`. On expiry the future is dropped.
pub async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("backend call abandoned after {:?}", limit);
            Err(Error::Timeout(limit))
        }
    }
}

pub async fn embed_texts(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let embedder = Arc::clone(embedder);
    let expected = texts.len();
    let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
        .await
        .map_err(|e| Error::EmbeddingUnavailable(format!("embedding task failed: {e}")))?
        .map_err(|e| Error::embedding(&e))?;
    if vectors.len() != expected {
        return Err(Error::EmbeddingUnavailable(format!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            expected
        )));
    }
    Ok(vectors)
}

pub async fn embed_one(embedder: &Arc<dyn Embedder>, text: &str) -> Result<Vec<f32>> {
    embed_texts(embedder, vec![text.to_string()])
        .await?
        .pop()
        .ok_or_else(|| Error::EmbeddingUnavailable("embedder returned no vector".into()))
}

pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, actual: vector.len() })
    }
}
