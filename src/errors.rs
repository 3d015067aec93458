//! Error types for SlideScout
//!
//! Every failure the retrieval core can report falls into one category.
//! Callers match on the category to decide whether to retry, apologize, or
//! fail the request; none of them are ever folded into an empty result.

use thiserror::Error;

/// Main error type for the retrieval pipeline
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Non-positive `k`/`top_n`, malformed query, or mismatched vector shape
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding backend unreachable or erroring
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Cross-encoder backend unreachable or erroring
    #[error("Rerank backend unavailable: {0}")]
    RerankUnavailable(String),

    /// Vector index unreachable or corrupt
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Pipeline invoked before model and index initialization completed
    #[error("Retrieval pipeline is not ready")]
    NotReady,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Slide corpus could not be read or parsed
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Whether a caller may reasonably retry the same request later.
    ///
    /// Input errors are never retryable; backend outages and the
    /// initialization window are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable(_)
                | Self::RerankUnavailable(_)
                | Self::IndexUnavailable(_)
                | Self::NotReady
        )
    }

    pub(crate) fn embedding(err: anyhow::Error) -> Self {
        Self::EmbeddingUnavailable(format!("{:#}", err))
    }

    pub(crate) fn rerank(err: anyhow::Error) -> Self {
        Self::RerankUnavailable(format!("{:#}", err))
    }

    pub(crate) fn index(err: anyhow::Error) -> Self {
        Self::IndexUnavailable(format!("{:#}", err))
    }
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;
