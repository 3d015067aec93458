// Search modes for the first retrieval stage
use serde::{Deserialize, Serialize};

use crate::embedding::dot;
use crate::errors::{Result, RetrievalError};
use crate::vector_db::IndexHit;

/// How the retriever turns an index lookup into candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchMode {
    /// Plain top-k by cosine similarity
    Similarity,
    /// Top-k, then drop hits below `threshold`
    SimilarityScoreThreshold { threshold: f32 },
    /// Maximal marginal relevance over a wider `fetch_k` pool
    Mmr { fetch_k: usize, lambda: f32 },
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Similarity
    }
}

impl SearchMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Similarity => "similarity",
            Self::SimilarityScoreThreshold { .. } => "similarity_score_threshold",
            Self::Mmr { .. } => "mmr",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Similarity => Ok(()),
            Self::SimilarityScoreThreshold { threshold } if !threshold.is_finite() => Err(
                RetrievalError::InvalidQuery("score threshold must be finite".to_string()),
            ),
            Self::SimilarityScoreThreshold { .. } => Ok(()),
            Self::Mmr { fetch_k, .. } if fetch_k == 0 => Err(RetrievalError::InvalidQuery(
                "mmr fetch_k must be positive".to_string(),
            )),
            Self::Mmr { lambda, .. } if !(0.0..=1.0).contains(&lambda) => Err(
                RetrievalError::InvalidQuery(format!("mmr lambda must be in [0, 1], got {}", lambda)),
            ),
            Self::Mmr { .. } => Ok(()),
        }
    }
}

/// Greedy maximal marginal relevance selection.
///
/// Each step picks the hit maximizing
/// `lambda * sim(query, d) - (1 - lambda) * max(sim(d, s) for s in selected)`.
/// Ties go to the hit the index ranked higher. Work is O(k * hits).
pub fn mmr_select(hits: Vec<IndexHit>, k: usize, lambda: f32) -> Result<Vec<IndexHit>> {
    if hits.iter().any(|h| h.vector.is_none()) {
        return Err(RetrievalError::IndexUnavailable(
            "mmr requires stored vectors for every hit".to_string(),
        ));
    }

    let mut remaining: Vec<Option<IndexHit>> = hits.into_iter().map(Some).collect();
    let mut selected: Vec<IndexHit> = Vec::with_capacity(k.min(remaining.len()));

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;

        for (i, slot) in remaining.iter().enumerate() {
            let Some(hit) = slot else { continue };
            let vector = hit.vector.as_deref().unwrap_or_default();

            let redundancy = selected
                .iter()
                .map(|s| dot(vector, s.vector.as_deref().unwrap_or_default()))
                .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |a| a.max(sim))))
                .unwrap_or(0.0);

            let score = lambda * hit.similarity - (1.0 - lambda) * redundancy;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        match best.and_then(|(i, _)| remaining[i].take()) {
            Some(hit) => selected.push(hit),
            None => break,
        }
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    fn hit(id: &str, similarity: f32, vector: Vec<f32>) -> IndexHit {
        IndexHit {
            passage: Passage::new(id, id),
            similarity,
            vector: Some(vector),
        }
    }

    fn ids(hits: &[IndexHit]) -> Vec<&str> {
        hits.iter().map(|h| h.passage.id.as_str()).collect()
    }

    #[test]
    fn test_mmr_lambda_one_is_similarity_order() {
        let hits = vec![
            hit("a", 0.9, vec![1.0, 0.0]),
            hit("b", 0.8, vec![1.0, 0.0]),
            hit("c", 0.1, vec![0.0, 1.0]),
        ];
        let selected = mmr_select(hits, 3, 1.0).unwrap();
        assert_eq!(ids(&selected), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mmr_penalizes_duplicates() {
        // "b" duplicates "a"; "c" is less similar but novel
        let hits = vec![
            hit("a", 0.9, vec![1.0, 0.0]),
            hit("b", 0.89, vec![1.0, 0.0]),
            hit("c", 0.6, vec![0.0, 1.0]),
        ];
        let selected = mmr_select(hits, 2, 0.5).unwrap();
        assert_eq!(ids(&selected), vec!["a", "c"]);
    }

    #[test]
    fn test_mmr_fewer_hits_than_k() {
        let hits = vec![hit("a", 0.9, vec![1.0, 0.0])];
        let selected = mmr_select(hits, 5, 0.5).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_mmr_requires_vectors() {
        let mut missing = hit("a", 0.9, vec![1.0, 0.0]);
        missing.vector = None;
        let err = mmr_select(vec![missing], 1, 0.5).unwrap_err();
        assert!(matches!(err, RetrievalError::IndexUnavailable(_)));
    }

    #[test]
    fn test_mmr_ties_prefer_earlier_hit() {
        let hits = vec![
            hit("first", 0.5, vec![1.0, 0.0]),
            hit("second", 0.5, vec![0.0, 1.0]),
        ];
        let selected = mmr_select(hits, 1, 0.5).unwrap();
        assert_eq!(ids(&selected), vec!["first"]);
    }

    #[test]
    fn test_validate() {
        assert!(SearchMode::Similarity.validate().is_ok());
        assert!(SearchMode::Mmr { fetch_k: 20, lambda: 0.5 }.validate().is_ok());
        assert!(SearchMode::Mmr { fetch_k: 0, lambda: 0.5 }.validate().is_err());
        assert!(SearchMode::Mmr { fetch_k: 20, lambda: 1.5 }.validate().is_err());
        assert!(SearchMode::SimilarityScoreThreshold { threshold: f32::NAN }
            .validate()
            .is_err());
    }

    #[test]
    fn test_mode_serde_tagging() {
        let mode: SearchMode =
            serde_json::from_str(r#"{"type": "mmr", "fetch_k": 20, "lambda": 0.5}"#).unwrap();
        assert_eq!(mode, SearchMode::Mmr { fetch_k: 20, lambda: 0.5 });
        assert_eq!(mode.name(), "mmr");
    }
}
