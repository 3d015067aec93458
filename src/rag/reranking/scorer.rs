// Re-ranking scorer for retrieved slide candidates
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::cross_encoder::CrossEncoder;
use crate::errors::{Result, RetrievalError};
use crate::types::{Candidate, RankedCandidate};

// Keeps normalized scores strictly inside (0, 1) even where the f64 logistic
// saturates; well within 1e-6 of the exact sigmoid.
const MIN_NORM: f64 = 1e-12;
const MAX_NORM: f64 = 1.0 - 1e-12;

/// Logistic function, stable for large |x|
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Second-stage ranker over retrieval candidates
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self {
        Self { encoder }
    }

    /// Score every candidate against `query` and keep the best `top_n`.
    ///
    /// Output is sorted by normalized score, highest first, then by raw score;
    /// exact ties keep ascending `initial_rank`. Backend failures are returned as
    /// `RerankUnavailable`, never replaced by the retrieval order.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_n: usize,
    ) -> Result<Vec<RankedCandidate>> {
        if top_n == 0 {
            return Err(RetrievalError::InvalidQuery(
                "top_n must be a positive integer, got 0".to_string(),
            ));
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let passages: Vec<&str> = candidates.iter().map(|c| c.content()).collect();
        let raw_scores = self.encoder.score_pairs(query, &passages).await?;

        if raw_scores.len() != candidates.len() {
            return Err(RetrievalError::RerankUnavailable(format!(
                "expected {} scores, cross-encoder returned {}",
                candidates.len(),
                raw_scores.len()
            )));
        }
        if let Some(bad) = raw_scores.iter().find(|s| !s.is_finite()) {
            return Err(RetrievalError::RerankUnavailable(format!(
                "cross-encoder returned non-finite score {}",
                bad
            )));
        }

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .zip(raw_scores)
            .map(|(candidate, raw)| {
                let raw = raw as f64;
                RankedCandidate {
                    candidate,
                    rerank_score_raw: raw,
                    rerank_score_norm: sigmoid(raw).clamp(MIN_NORM, MAX_NORM),
                    final_rank: 0,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.rerank_score_norm
                .partial_cmp(&a.rerank_score_norm)
                .unwrap_or(Ordering::Equal)
                // Clamped scores can collide; the raw logit still orders them
                .then_with(|| b.rerank_score_raw.total_cmp(&a.rerank_score_raw))
                .then_with(|| a.initial_rank().cmp(&b.initial_rank()))
        });
        ranked.truncate(top_n);

        for (i, item) in ranked.iter_mut().enumerate() {
            item.final_rank = i + 1;
        }

        debug!(kept = ranked.len(), top_n, "Reranked candidates");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Looks each passage up in a table of logits and counts calls
    struct TableEncoder {
        logits: HashMap<String, f32>,
        calls: AtomicUsize,
    }

    impl TableEncoder {
        fn new(entries: &[(&str, f32)]) -> Self {
            Self {
                logits: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CrossEncoder for TableEncoder {
        async fn score_pairs(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(passages
                .iter()
                .map(|p| self.logits.get(*p).copied().unwrap_or(0.0))
                .collect())
        }
    }

    struct ShortEncoder;

    #[async_trait]
    impl CrossEncoder for ShortEncoder {
        async fn score_pairs(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    fn candidates(contents: &[&str]) -> Vec<Candidate> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| Candidate::new(Passage::new(format!("p{}", i), *c), i + 1))
            .collect()
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(2.0) - 0.880_797_077_977_882_3).abs() < 1e-12);
        assert!((sigmoid(-2.0) - 0.119_202_922_022_117_7).abs() < 1e-12);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[tokio::test]
    async fn test_rerank_sorts_by_score() {
        let encoder = Arc::new(TableEncoder::new(&[("B", -1.0), ("A", 2.0), ("C", 0.5)]));
        let reranker = Reranker::new(encoder.clone());

        let ranked = reranker
            .rerank("query", candidates(&["B", "A", "C"]), 3)
            .await
            .unwrap();

        let view: Vec<(&str, usize, usize)> = ranked
            .iter()
            .map(|r| (r.content(), r.initial_rank(), r.final_rank))
            .collect();
        assert_eq!(view, vec![("A", 2, 1), ("C", 3, 2), ("B", 1, 3)]);
        assert_eq!(encoder.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rerank_truncates_to_top_n() {
        let encoder = Arc::new(TableEncoder::new(&[("A", 1.0), ("B", 2.0), ("C", 3.0)]));
        let reranker = Reranker::new(encoder);

        let ranked = reranker
            .rerank("query", candidates(&["A", "B", "C"]), 2)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].content(), "C");
        assert_eq!(ranked[1].final_rank, 2);
    }

    #[tokio::test]
    async fn test_rerank_empty_skips_model() {
        let encoder = Arc::new(TableEncoder::new(&[]));
        let reranker = Reranker::new(encoder.clone());

        let ranked = reranker.rerank("query", Vec::new(), 5).await.unwrap();
        assert!(ranked.is_empty());
        assert_eq!(encoder.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rerank_zero_top_n_is_invalid() {
        let reranker = Reranker::new(Arc::new(TableEncoder::new(&[])));
        let err = reranker
            .rerank("query", candidates(&["A"]), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_score_count_mismatch_is_rerank_error() {
        let reranker = Reranker::new(Arc::new(ShortEncoder));
        let err = reranker
            .rerank("query", candidates(&["A", "B"]), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::RerankUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_finite_score_is_rerank_error() {
        let reranker = Reranker::new(Arc::new(TableEncoder::new(&[("A", f32::NAN)])));
        let err = reranker
            .rerank("query", candidates(&["A"]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::RerankUnavailable(_)));
    }

    #[tokio::test]
    async fn test_extreme_logits_stay_inside_unit_interval() {
        let encoder = Arc::new(TableEncoder::new(&[("hi", 80.0), ("lo", -80.0)]));
        let reranker = Reranker::new(encoder);

        let ranked = reranker
            .rerank("query", candidates(&["hi", "lo"]), 2)
            .await
            .unwrap();
        assert!(ranked.iter().all(|r| r.rerank_score_norm > 0.0 && r.rerank_score_norm < 1.0));
        assert_eq!(ranked[0].content(), "hi");
    }

    #[tokio::test]
    async fn test_saturated_scores_keep_logit_order() {
        let encoder = Arc::new(TableEncoder::new(&[("far", -40.0), ("near", -30.0)]));
        let reranker = Reranker::new(encoder);

        let ranked = reranker
            .rerank("query", candidates(&["far", "near"]), 2)
            .await
            .unwrap();
        assert_eq!(ranked[0].rerank_score_norm, ranked[1].rerank_score_norm);
        assert_eq!(ranked[0].content(), "near");
        assert_eq!(ranked[0].initial_rank(), 2);
    }
}
