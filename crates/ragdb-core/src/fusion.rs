//! Weighted fusion of lexical and vector scores.
//!
//! `combined = text_weight * lexical + vector_weight * cosine`. The weights are
//! independent multipliers and need not sum to 1. A candidate survives iff
//! `combined >= min_score`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEXT_WEIGHT: f32 = 0.3;
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

/// Boost applied to the title field relative to body text in lexical scoring.
pub const TITLE_BOOST: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub text_weight: f32,
    pub vector_weight: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { text_weight: DEFAULT_TEXT_WEIGHT, vector_weight: DEFAULT_VECTOR_WEIGHT }
    }
}

impl FusionWeights {
    pub fn new(text_weight: f32, vector_weight: f32) -> Self {
        Self { text_weight, vector_weight }
    }

    pub fn combine(&self, lexical: f32, cosine: f32) -> f32 {
        self.text_weight * lexical + self.vector_weight * cosine
    }

    /// Scores every candidate, drops those under `min_score` and orders the
    /// rest by combined score, highest first. Ties keep input order.
    pub fn fuse<T>(&self, candidates: impl IntoIterator<Item = (T, f32, f32)>, min_score: f32) -> Vec<(T, f32)> {
        let mut kept: Vec<(T, f32)> = candidates
            .into_iter()
            .map(|(item, lexical, cosine)| (item, self.combine(lexical, cosine)))
            .filter(|(_, score)| *score >= min_score)
            .collect();
        kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        kept
    }
}

/// Dot product over norms, in [-1, 1]. Zero when either side has no length or
/// the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Nearest-neighbour score in [0, 1]: `(1 + cosine) / 2`.
pub fn knn_score(a: &[f32], b: &[f32]) -> f32 {
    (1.0 + cosine_similarity(a, b)) / 2.0
}
