// Cross-encoder backends
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config, XLMRobertaForSequenceClassification};
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::errors::{Result, RetrievalError};

pub const DEFAULT_MODEL_ID: &str = "BAAI/bge-reranker-base";
const MAX_SEQUENCE_LEN: usize = 512;

/// Scores (query, passage) pairs jointly.
///
/// Returns one raw relevance logit per passage, in input order. Scoring a
/// batch must give the same numbers as scoring each pair alone.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;
}

struct BgeModel {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    pad_id: u32,
    device: Device,
}

/// BGE reranker (XLM-RoBERTa sequence classifier with one output logit)
pub struct BgeCrossEncoder {
    inner: Arc<BgeModel>,
    model_id: String,
}

impl BgeCrossEncoder {
    /// Load the model (downloads weights on first use)
    pub fn load(model_id: &str, cache_dir: Option<&Path>) -> Result<Self> {
        Self::load_inner(model_id, cache_dir).map_err(RetrievalError::rerank)
    }

    fn load_inner(model_id: &str, cache_dir: Option<&Path>) -> anyhow::Result<Self> {
        info!(model = model_id, "Loading reranker model");
        let device = Device::Cpu;

        let mut builder = ApiBuilder::new();
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder
            .build()
            .context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json")
            .context("Failed to download reranker config")?;
        let tokenizer_path = repo.get("tokenizer.json")
            .context("Failed to download reranker tokenizer")?;
        let weights_path = repo.get("model.safetensors")
            .context("Failed to download reranker weights")?;

        let config: Config = serde_json::from_str(
            &std::fs::read_to_string(config_path).context("Failed to read reranker config")?,
        )
        .context("Failed to parse reranker config")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        let pad_id = tokenizer.token_to_id("<pad>").unwrap_or(1);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load reranker weights")?
        };
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)
            .context("Failed to create XLM-RoBERTa classifier")?;

        Ok(Self {
            inner: Arc::new(BgeModel {
                model,
                tokenizer,
                pad_id,
                device,
            }),
            model_id: model_id.to_string(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl BgeModel {
    fn score(&self, pairs: Vec<(String, String)>) -> anyhow::Result<Vec<f32>> {
        let batch_size = pairs.len();
        let encodings = self.tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let mut flat_ids = vec![self.pad_id; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];
        let mut flat_types = vec![0u32; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * max_len;
            let len = encoding.get_ids().len();
            flat_ids[row..row + len].copy_from_slice(encoding.get_ids());
            flat_mask[row..row + len].copy_from_slice(encoding.get_attention_mask());
            flat_types[row..row + len].copy_from_slice(encoding.get_type_ids());
        }

        let input_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(flat_types, (batch_size, max_len), &self.device)?;

        let logits = self.model
            .forward(&input_ids, &attention_mask, &token_type_ids)
            .context("XLM-RoBERTa forward pass failed")?
            .to_dtype(DType::F32)?;

        // (batch, 1) -> one logit per pair
        Ok(logits.flatten_all()?.to_vec1::<f32>()?)
    }
}

#[async_trait]
impl CrossEncoder for BgeCrossEncoder {
    async fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        debug!(pairs = passages.len(), "Scoring pairs");

        let pairs: Vec<(String, String)> = passages
            .iter()
            .map(|p| (query.to_string(), p.to_string()))
            .collect();
        let model = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || model.score(pairs))
            .await
            .map_err(|e| RetrievalError::RerankUnavailable(format!("Rerank task failed: {}", e)))?
            .map_err(RetrievalError::rerank)
    }
}
