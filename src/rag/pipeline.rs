// End-to-end slide retrieval: retrieve -> rerank
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::errors::{Result, RetrievalError};
use crate::rag::reranking::Reranker;
use crate::rag::retrieval::CandidateRetriever;
use crate::types::{Candidate, RankedCandidate};

/// Per-call sizes for the two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Candidates fetched from the vector index
    pub initial_k: usize,
    /// Results kept after reranking
    pub final_n: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            initial_k: 10,
            final_n: 5,
        }
    }
}

/// Before/after view of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalComparison {
    pub query: String,
    pub candidates: Vec<Candidate>,
    pub ranked: Vec<RankedCandidate>,
}

/// Retriever plus reranker over shared read-only models and index
pub struct RetrievalPipeline {
    retriever: CandidateRetriever,
    reranker: Reranker,
}

impl RetrievalPipeline {
    pub fn new(retriever: CandidateRetriever, reranker: Reranker) -> Self {
        Self {
            retriever,
            reranker,
        }
    }

    /// Ranked passages for `query`: top `initial_k` by vector search,
    /// reranked, truncated to `final_n`
    pub async fn answer_context(
        &self,
        query: &str,
        initial_k: usize,
        final_n: usize,
    ) -> Result<Vec<RankedCandidate>> {
        check_final_n(final_n)?;

        let candidates = self.retriever.retrieve(query, initial_k).await?;
        let retrieved = candidates.len();
        let ranked = self.reranker.rerank(query, candidates, final_n).await?;

        debug!(retrieved, returned = ranked.len(), "Pipeline complete");
        Ok(ranked)
    }

    /// Same as `answer_context` with `RetrievalParams`
    pub async fn run(&self, query: &str, params: RetrievalParams) -> Result<Vec<RankedCandidate>> {
        self.answer_context(query, params.initial_k, params.final_n).await
    }

    /// Both stages' outputs, for inspecting what reranking changed
    pub async fn compare(&self, query: &str, params: RetrievalParams) -> Result<RetrievalComparison> {
        check_final_n(params.final_n)?;
        let candidates = self.retriever.retrieve(query, params.initial_k).await?;
        let ranked = self
            .reranker
            .rerank(query, candidates.clone(), params.final_n)
            .await?;

        Ok(RetrievalComparison {
            query: query.to_string(),
            candidates,
            ranked,
        })
    }

    pub fn retriever(&self) -> &CandidateRetriever {
        &self.retriever
    }
}

// Rejected before any model work
fn check_final_n(final_n: usize) -> Result<()> {
    if final_n == 0 {
        return Err(RetrievalError::InvalidQuery(
            "final_n must be a positive integer, got 0".to_string(),
        ));
    }
    Ok(())
}

/// Service handle injected into request handlers.
///
/// Holds the pipeline once startup has built it. Calls made while models
/// are still loading fail with `NotReady` instead of waiting.
#[derive(Default)]
pub struct RetrievalService {
    pipeline: OnceCell<RetrievalPipeline>,
}

impl RetrievalService {
    /// Create a service that is not ready yet
    pub fn new() -> Self {
        Self {
            pipeline: OnceCell::new(),
        }
    }

    /// Create a service that is ready immediately
    pub fn ready(pipeline: RetrievalPipeline) -> Self {
        Self {
            pipeline: OnceCell::new_with(Some(pipeline)),
        }
    }

    /// Run `init` once and publish its pipeline.
    ///
    /// A failed initialization leaves the service not ready, so startup may
    /// try again.
    pub async fn initialize<F, Fut>(&self, init: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RetrievalPipeline>>,
    {
        if self.pipeline.initialized() {
            return Err(RetrievalError::Config(
                "retrieval service is already initialized".to_string(),
            ));
        }
        // A concurrent caller may have won the cell while we waited on it
        let mut ran = false;
        self.pipeline
            .get_or_try_init(|| {
                ran = true;
                init()
            })
            .await?;
        if !ran {
            return Err(RetrievalError::Config(
                "retrieval service is already initialized".to_string(),
            ));
        }
        info!("Retrieval service ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.initialized()
    }

    pub fn pipeline(&self) -> Result<&RetrievalPipeline> {
        self.pipeline.get().ok_or(RetrievalError::NotReady)
    }

    /// Sole entry point for the agent tool layer
    pub async fn answer_context(
        &self,
        query: &str,
        initial_k: usize,
        final_n: usize,
    ) -> Result<Vec<RankedCandidate>> {
        self.pipeline()?
            .answer_context(query, initial_k, final_n)
            .await
    }
}
