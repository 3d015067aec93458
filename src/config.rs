use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{Result, RetrievalError};
use crate::rag::{RetrievalParams, SearchMode};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub index: IndexSettings,
}

/// Named search strategies as written in config files and `SEARCH_TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Similarity,
    SimilarityScoreThreshold,
    Mmr,
}

impl FromStr for SearchType {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "similarity" => Ok(Self::Similarity),
            "similarity_score_threshold" => Ok(Self::SimilarityScoreThreshold),
            "mmr" => Ok(Self::Mmr),
            other => Err(RetrievalError::Config(format!("unknown search type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub initial_retrieval_k: usize,
    pub rerank_top_k: usize,
    pub search_type: SearchType,
    pub score_threshold: f32,
    pub mmr_fetch_k: usize,
    pub mmr_lambda: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            initial_retrieval_k: 10,
            rerank_top_k: 5,
            search_type: SearchType::Similarity,
            score_threshold: 0.5,
            mmr_fetch_k: 20,
            mmr_lambda: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_model: String,
    pub reranker_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_model: crate::embedding::engine::DEFAULT_MODEL_ID.to_string(),
            reranker_model: crate::rag::reranking::cross_encoder::DEFAULT_MODEL_ID.to_string(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    Memory,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    /// Slide JSON directory served by the in-memory backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_dir: Option<PathBuf>,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            corpus_dir: None,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "slides".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            config
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file (no env overrides)
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RetrievalError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            RetrievalError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RetrievalError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RetrievalError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".slidescout").join("config.toml"))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    ///
    /// Recognized keys: `INITIAL_RETRIEVAL_K`, `RERANK_TOP_K`, `SEARCH_TYPE`,
    /// `E5_MODEL`, `RERANKER_MODEL`, `CACHE_DIR`, `DB_DIR`, `JSON_DIR`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("INITIAL_RETRIEVAL_K") {
            self.retrieval.initial_retrieval_k = parse_count("INITIAL_RETRIEVAL_K", &v)?;
        }
        if let Some(v) = lookup("RERANK_TOP_K") {
            self.retrieval.rerank_top_k = parse_count("RERANK_TOP_K", &v)?;
        }
        if let Some(v) = lookup("SEARCH_TYPE") {
            self.retrieval.search_type = v.parse()?;
        }
        if let Some(v) = lookup("E5_MODEL") {
            self.models.embedding_model = v;
        }
        if let Some(v) = lookup("RERANKER_MODEL") {
            self.models.reranker_model = v;
        }
        if let Some(v) = lookup("CACHE_DIR") {
            self.models.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DB_DIR") {
            self.index.backend = IndexBackend::Qdrant;
            self.index.qdrant_url = v;
        }
        if let Some(v) = lookup("JSON_DIR") {
            self.index.corpus_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.initial_retrieval_k == 0 {
            return Err(RetrievalError::Config(
                "initial_retrieval_k must be positive".to_string(),
            ));
        }
        if self.retrieval.rerank_top_k == 0 {
            return Err(RetrievalError::Config("rerank_top_k must be positive".to_string()));
        }
        self.search_mode()
            .validate()
            .map_err(|e| RetrievalError::Config(e.to_string()))
    }

    /// Search mode as plain pipeline parameters
    pub fn search_mode(&self) -> SearchMode {
        let r = &self.retrieval;
        match r.search_type {
            SearchType::Similarity => SearchMode::Similarity,
            SearchType::SimilarityScoreThreshold => SearchMode::SimilarityScoreThreshold {
                threshold: r.score_threshold,
            },
            SearchType::Mmr => SearchMode::Mmr {
                fetch_k: r.mmr_fetch_k,
                lambda: r.mmr_lambda,
            },
        }
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            initial_k: self.retrieval.initial_retrieval_k,
            final_n: self.retrieval.rerank_top_k,
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| RetrievalError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
