// In-memory vector index: exact cosine search over a frozen passage set
use async_trait::async_trait;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::{check_k, IndexHit, VectorIndex};
use crate::embedding::{dot, ensure_usable, l2_normalize, EmbeddingProvider, EmbeddingRole};
use crate::errors::{Result, RetrievalError};
use crate::types::Passage;

/// Passages embedded per provider call during `build`
const BUILD_BATCH_SIZE: usize = 32;

struct IndexEntry {
    passage: Passage,
    vector: Vec<f32>,
}

/// Brute-force cosine index.
///
/// Entries are immutable once the index is shared, so concurrent queries
/// need no locking. Equal similarities resolve to insertion order.
pub struct InMemoryIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl InMemoryIndex {
    /// Create an empty index for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Embed `passages` with the passage role and index them
    pub async fn build(
        embedder: &dyn EmbeddingProvider,
        passages: Vec<Passage>,
    ) -> Result<Self> {
        let mut index = Self::new(embedder.dimension());
        info!(passages = passages.len(), "Building in-memory index");

        let mut pending = passages.into_iter().peekable();
        while pending.peek().is_some() {
            let chunk: Vec<Passage> = pending.by_ref().take(BUILD_BATCH_SIZE).collect();
            let texts: Vec<&str> = chunk.iter().map(|p| p.content.as_str()).collect();
            let vectors = embedder.embed_batch(&texts, EmbeddingRole::Passage).await?;

            if vectors.len() != chunk.len() {
                return Err(RetrievalError::EmbeddingUnavailable(format!(
                    "expected {} vectors, backend returned {}",
                    chunk.len(),
                    vectors.len()
                )));
            }

            for (passage, vector) in chunk.into_iter().zip(vectors) {
                index.insert(passage, vector)?;
            }
        }

        debug!(entries = index.entries.len(), "In-memory index ready");
        Ok(index)
    }

    /// Add one passage with a precomputed vector, stored at unit length
    pub fn insert(&mut self, passage: Passage, vector: Vec<f32>) -> Result<()> {
        if !passage.is_indexable() {
            return Err(RetrievalError::Corpus(format!(
                "passage {} has empty content",
                passage.id
            )));
        }
        ensure_usable(&vector, self.dimension)?;

        self.entries.push(IndexEntry {
            passage,
            vector: l2_normalize(vector),
        });
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn rank(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        check_k(k)?;
        if vector.len() != self.dimension {
            return Err(RetrievalError::InvalidQuery(format!(
                "query vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        // Stored vectors are unit length, so this dot product is the cosine
        let query = l2_normalize(vector.to_vec());
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, dot(&query, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn hits(&self, ranked: Vec<(usize, f32)>, with_vectors: bool) -> Vec<IndexHit> {
        ranked
            .into_iter()
            .map(|(i, similarity)| {
                let entry = &self.entries[i];
                IndexHit {
                    passage: entry.passage.clone(),
                    similarity,
                    vector: with_vectors.then(|| entry.vector.clone()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let ranked = self.rank(vector, k)?;
        Ok(self.hits(ranked, false))
    }

    async fn query_with_vectors(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let ranked = self.rank(vector, k)?;
        Ok(self.hits(ranked, true))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
