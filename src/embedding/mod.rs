//! Embedding providers
//!
//! Turns queries and passages into unit-length dense vectors. Asymmetric
//! models such as E5 are trained with a role prefix on every input, so the
//! role is an explicit parameter rather than something callers concatenate.

pub mod engine;

pub use engine::E5Embedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RetrievalError};

/// Which side of the asymmetric embedding space a text belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingRole {
    Query,
    Passage,
}

impl EmbeddingRole {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Query => "query: ",
            Self::Passage => "passage: ",
        }
    }

    /// Frame `text` the way the model saw it during training
    pub fn apply(&self, text: &str) -> String {
        format!("{}{}", self.prefix(), text)
    }
}

/// Text to vector backend shared read-only across requests
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts under one role. Output order matches input.
    async fn embed_batch(&self, texts: &[&str], role: EmbeddingRole) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension D
    fn dimension(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text], role).await?;
        if vectors.len() != 1 {
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "expected 1 vector, backend returned {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

/// Scale a vector to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

/// Dot product; equals cosine similarity for unit vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Reject vectors a healthy backend would never produce.
///
/// A zero or non-finite vector means the model failed without saying so;
/// letting it through would rank passages by noise.
pub fn ensure_usable(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(RetrievalError::EmbeddingUnavailable(format!(
            "vector has dimension {}, expected {}",
            vector.len(),
            dimension
        )));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(RetrievalError::EmbeddingUnavailable(
            "vector contains non-finite values".to_string(),
        ));
    }
    if vector.iter().all(|x| *x == 0.0) {
        return Err(RetrievalError::EmbeddingUnavailable(
            "backend returned a zero vector".to_string(),
        ));
    }
    Ok(())
}
