// Candidate retriever: first stage of the slide pipeline
use std::sync::Arc;
use tracing::debug;

use super::search_mode::{mmr_select, SearchMode};
use crate::embedding::{ensure_usable, EmbeddingProvider, EmbeddingRole};
use crate::errors::{Result, RetrievalError};
use crate::types::Candidate;
use crate::vector_db::VectorIndex;

/// Embeds a query and turns the index's nearest neighbours into candidates
pub struct CandidateRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    mode: SearchMode,
}

impl CandidateRetriever {
    /// Create retriever using plain similarity search
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            mode: SearchMode::Similarity,
        }
    }

    /// Create with a specific search mode
    pub fn with_mode(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        mode: SearchMode,
    ) -> Result<Self> {
        mode.validate()?;
        Ok(Self {
            embedder,
            index,
            mode,
        })
    }

    /// Retrieve up to `k` candidates for `query`, ranked 1..=n in index order
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Err(RetrievalError::InvalidQuery(
                "k must be a positive integer, got 0".to_string(),
            ));
        }

        let query_vector = self.embedder.embed(query, EmbeddingRole::Query).await?;
        ensure_usable(&query_vector, self.embedder.dimension())?;

        let hits = match self.mode {
            SearchMode::Similarity => self.index.query(&query_vector, k).await?,
            SearchMode::SimilarityScoreThreshold { threshold } => {
                let mut hits = self.index.query(&query_vector, k).await?;
                hits.retain(|h| h.similarity >= threshold);
                hits
            }
            SearchMode::Mmr { fetch_k, lambda } => {
                let pool = self
                    .index
                    .query_with_vectors(&query_vector, fetch_k.max(k))
                    .await?;
                mmr_select(pool, k, lambda)?
            }
        };

        debug!(mode = self.mode.name(), k, hits = hits.len(), "Retrieved candidates");

        Ok(hits
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, hit)| Candidate::new(hit.passage, i + 1))
            .collect())
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }
}
