//! Deterministic stub backends shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use slidescout::embedding::{l2_normalize, EmbeddingProvider, EmbeddingRole};
use slidescout::rag::{CandidateRetriever, CrossEncoder, Reranker, RetrievalPipeline};
use slidescout::vector_db::InMemoryIndex;
use slidescout::{Passage, Result, RetrievalError};

/// Inverse sigmoid, for stubbing a desired normalized score
pub fn logit(p: f64) -> f32 {
    (p / (1.0 - p)).ln() as f32
}

/// Looks texts up in a table; unknown texts map to a fixed fallback vector
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    pub roles: Mutex<Vec<EmbeddingRole>>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(2);
        let mut fallback = vec![0.0; dimension];
        fallback[0] = 1.0;

        Self {
            vectors: entries
                .iter()
                .map(|(k, v)| (k.to_string(), l2_normalize(v.clone())))
                .collect(),
            fallback,
            roles: Mutex::new(Vec::new()),
        }
    }

    pub fn roles_seen(&self) -> Vec<EmbeddingRole> {
        self.roles.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed_batch(&self, texts: &[&str], role: EmbeddingRole) -> Result<Vec<Vec<f32>>> {
        self.roles.lock().unwrap().push(role);
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(*t).cloned().unwrap_or_else(|| self.fallback.clone()))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }
}

/// Embedding backend that is always down
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed_batch(&self, _texts: &[&str], _role: EmbeddingRole) -> Result<Vec<Vec<f32>>> {
        Err(RetrievalError::EmbeddingUnavailable("connection refused".to_string()))
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Scores passages from a table of logits; unknown passages score 0.0
pub struct TableCrossEncoder {
    logits: HashMap<String, f32>,
    pub calls: AtomicUsize,
}

impl TableCrossEncoder {
    pub fn new(entries: &[(&str, f32)]) -> Self {
        Self {
            logits: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrossEncoder for TableCrossEncoder {
    async fn score_pairs(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(passages
            .iter()
            .map(|p| self.logits.get(*p).copied().unwrap_or(0.0))
            .collect())
    }
}

/// Reads the logit straight out of the passage text
pub struct EchoCrossEncoder;

#[async_trait]
impl CrossEncoder for EchoCrossEncoder {
    async fn score_pairs(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        passages
            .iter()
            .map(|p| {
                p.parse::<f32>()
                    .map_err(|e| RetrievalError::RerankUnavailable(format!("bad score '{}': {}", p, e)))
            })
            .collect()
    }
}

/// Cross-encoder backend that is always down
pub struct DownCrossEncoder;

#[async_trait]
impl CrossEncoder for DownCrossEncoder {
    async fn score_pairs(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>> {
        Err(RetrievalError::RerankUnavailable("model server returned 503".to_string()))
    }
}

/// Embedder for the three-slide corpus "A", "B", "C".
///
/// The query "q" lands closest to B, then A, then C.
pub fn abc_embedder() -> Arc<TableEmbedder> {
    Arc::new(TableEmbedder::new(&[
        ("A", vec![1.0, 0.0]),
        ("B", vec![0.0, 1.0]),
        ("C", vec![-1.0, 0.0]),
        ("q", vec![0.6, 0.8]),
    ]))
}

pub fn abc_passages() -> Vec<Passage> {
    ["A", "B", "C"]
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Passage::new(format!("abc.json#{}", i), *c)
                .with_meta("course", "Letters")
                .with_meta("chapter", "Alphabet")
                .with_meta("page", i as i64 + 1)
        })
        .collect()
}

pub async fn abc_index(embedder: &TableEmbedder) -> Arc<InMemoryIndex> {
    Arc::new(InMemoryIndex::build(embedder, abc_passages()).await.unwrap())
}

/// Scores B -> 0.2, A -> 0.9, C -> 0.5 after normalization
pub fn abc_cross_encoder() -> Arc<TableCrossEncoder> {
    Arc::new(TableCrossEncoder::new(&[
        ("B", logit(0.2)),
        ("A", logit(0.9)),
        ("C", logit(0.5)),
    ]))
}

pub async fn abc_pipeline(encoder: Arc<dyn CrossEncoder>) -> RetrievalPipeline {
    let embedder = abc_embedder();
    let index = abc_index(&embedder).await;
    RetrievalPipeline::new(
        CandidateRetriever::new(embedder, index),
        Reranker::new(encoder),
    )
}
