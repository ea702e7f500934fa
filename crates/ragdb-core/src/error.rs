use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// HTTP-equivalent status for a transport layer sitting on top of this crate.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::DimensionMismatch { .. } => 422,
            Error::NotFound(_) => 404,
            Error::EmbeddingUnavailable(_) | Error::BackendUnavailable(_) => 503,
            Error::Timeout(_) => 504,
            Error::InvalidConfig(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Error::BackendUnavailable(err.to_string())
    }

    pub fn embedding(err: &anyhow::Error) -> Self {
        Error::EmbeddingUnavailable(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
