//! Candidate types produced per query
//!
//! Both types flatten into the record shape handed to the agent layer:
//! `{ id, content, metadata, initial_rank, rerank_score_raw,
//! rerank_score_norm, final_rank }`.

use serde::{Deserialize, Serialize};

use super::passage::Passage;

/// A passage annotated with its vector-search rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub passage: Passage,
    /// 1-based position in the index's return order
    pub initial_rank: usize,
}

impl Candidate {
    pub fn new(passage: Passage, initial_rank: usize) -> Self {
        Self {
            passage,
            initial_rank,
        }
    }

    pub fn content(&self) -> &str {
        &self.passage.content
    }
}

/// A candidate annotated with cross-encoder scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Unbounded logit from the cross-encoder
    pub rerank_score_raw: f64,
    /// sigmoid(rerank_score_raw), in (0, 1)
    pub rerank_score_norm: f64,
    /// 1-based position after reranking
    pub final_rank: usize,
}

impl RankedCandidate {
    pub fn passage(&self) -> &Passage {
        &self.candidate.passage
    }

    pub fn content(&self) -> &str {
        &self.candidate.passage.content
    }

    pub fn initial_rank(&self) -> usize {
        self.candidate.initial_rank
    }
}
