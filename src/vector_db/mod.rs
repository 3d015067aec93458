//! Vector index over embedded slide passages
//!
//! The pipeline only ever reads from an index. Populating and persisting it
//! belongs to ingestion; [`InMemoryIndex::build`] exists so a corpus
//! directory can be served without an external store.

pub mod memory;
pub mod qdrant;

pub use memory::InMemoryIndex;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;

use crate::errors::{Result, RetrievalError};
use crate::types::Passage;

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub passage: Passage,
    /// Cosine similarity to the query vector
    pub similarity: f32,
    /// Stored passage vector, present only for `query_with_vectors`
    pub vector: Option<Vec<f32>>,
}

/// Read-only approximate nearest-neighbour search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` hits, best similarity first.
    ///
    /// Equal similarities come back in a fixed order for a fixed index state.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    /// Same as [`VectorIndex::query`] but each hit carries its stored vector
    async fn query_with_vectors(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    /// Number of indexed passages
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

pub(crate) fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RetrievalError::InvalidQuery(
            "k must be a positive integer, got 0".to_string(),
        ));
    }
    Ok(())
}
