// E5 embedding engine - local embeddings via Candle
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::{l2_normalize, EmbeddingProvider, EmbeddingRole};
use crate::errors::{Result, RetrievalError};

pub const DEFAULT_MODEL_ID: &str = "intfloat/e5-base-v2";
const MAX_SEQUENCE_LEN: usize = 512;

struct E5Model {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

/// E5 embedding engine: BERT encoder, mean pooling, unit-norm output
pub struct E5Embedder {
    inner: Arc<E5Model>,
    model_id: String,
}

impl E5Embedder {
    /// Load the model (downloads weights on first use)
    pub fn load(model_id: &str, cache_dir: Option<&Path>) -> Result<Self> {
        Self::load_inner(model_id, cache_dir).map_err(RetrievalError::embedding)
    }

    fn load_inner(model_id: &str, cache_dir: Option<&Path>) -> anyhow::Result<Self> {
        info!(model = model_id, "Loading embedding model");
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
            .context("Failed to download model config")?;
        let tokenizer_path = repo.get("tokenizer.json")
            .context("Failed to download tokenizer")?;
        let weights_path = repo.get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;
        let config: Config = serde_json::from_str(&config_contents)
            .context("Failed to parse model config")?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_contents)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .context("Model config has no hidden_size")? as usize;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &config)
            .context("Failed to create BERT model")?;

        Ok(Self {
            inner: Arc::new(E5Model {
                model,
                tokenizer,
                device,
                dimension,
            }),
            model_id: model_id.to_string(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl E5Model {
    fn encode(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();
        let encodings = self.tokenizer
            .encode_batch(texts, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        // Pad to the longest sequence in the batch
        let mut flat_ids = vec![0u32; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let row = i * max_len;
            flat_ids[row..row + ids.len()].copy_from_slice(ids);
            flat_mask[row..row + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self.model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))
            .context("BERT forward pass failed")?;
        let pooled = mean_pool(&hidden, &attention_mask)?;

        let vectors = pooled.to_vec2::<f32>()?;
        Ok(vectors.into_iter().map(l2_normalize).collect())
    }
}

/// Mean pooling with attention mask
fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .expand(embeddings.shape())?
        .to_dtype(embeddings.dtype())?;

    let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
    let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

    Ok(sum_embeddings.broadcast_div(&sum_mask)?)
}

#[async_trait]
impl EmbeddingProvider for E5Embedder {
    async fn embed_batch(&self, texts: &[&str], role: EmbeddingRole) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), ?role, "Embedding batch");

        let framed: Vec<String> = texts.iter().map(|t| role.apply(t)).collect();
        let model = Arc::clone(&self.inner);

        // Inference is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || model.encode(framed))
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(format!("Embedding task failed: {}", e)))?
            .map_err(RetrievalError::embedding)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension
    }
}
