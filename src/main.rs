//! SlideScout - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use slidescout::{
    cli::{Args, Commands, Verbosity},
    config::{Config, IndexBackend},
    corpus,
    embedding::{E5Embedder, EmbeddingProvider},
    rag::{
        pipeline::{RetrievalComparison, RetrievalParams},
        reranking::{BgeCrossEncoder, CrossEncoder},
        CandidateRetriever, Reranker, RetrievalPipeline, RetrievalService, SlideTool,
    },
    vector_db::{InMemoryIndex, QdrantIndex, VectorIndex},
    Candidate, RankedCandidate, RetrievalError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env()?;
            config.validate()?;
            config
        }
        None => Config::load()?,
    };

    match args.command {
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{}", rendered);
        }
        Commands::Query {
            text,
            initial_k,
            final_n,
            json,
            compare,
            context,
        } => {
            let defaults = config.retrieval_params();
            let params = RetrievalParams {
                initial_k: initial_k.unwrap_or(defaults.initial_k),
                final_n: final_n.unwrap_or(defaults.final_n),
            };

            let service = Arc::new(RetrievalService::new());
            let spinner = start_spinner(verbosity, "Loading models and index");
            let init = service.initialize(|| build_pipeline(&config)).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            init.context("Failed to initialize retrieval pipeline")?;

            if context {
                let tool = SlideTool::new(Arc::clone(&service), params);
                println!("{}", tool.call(&text).await?);
            } else if compare {
                let comparison = service.pipeline()?.compare(&text, params).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&comparison)?);
                } else {
                    print_comparison(&comparison);
                }
            } else {
                let ranked = service
                    .answer_context(&text, params.initial_k, params.final_n)
                    .await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&ranked)?);
                } else {
                    print_ranked(&ranked);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn start_spinner(verbosity: Verbosity, message: &str) -> Option<ProgressBar> {
    if !verbosity.show_progress() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Load models and index, then wire the two stages together
async fn build_pipeline(config: &Config) -> slidescout::Result<RetrievalPipeline> {
    let cache_dir = config.models.cache_dir.clone();

    let model_id = config.models.embedding_model.clone();
    let cache = cache_dir.clone();
    let embedder = tokio::task::spawn_blocking(move || E5Embedder::load(&model_id, cache.as_deref()))
        .await
        .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))??;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);

    let model_id = config.models.reranker_model.clone();
    let encoder = tokio::task::spawn_blocking(move || BgeCrossEncoder::load(&model_id, cache_dir.as_deref()))
        .await
        .map_err(|e| RetrievalError::RerankUnavailable(e.to_string()))??;
    let encoder: Arc<dyn CrossEncoder> = Arc::new(encoder);

    let index: Arc<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Memory => {
            let dir = config.index.corpus_dir.as_ref().ok_or_else(|| {
                RetrievalError::Config(
                    "index.corpus_dir (or JSON_DIR) is required for the memory backend".to_string(),
                )
            })?;
            let passages = corpus::load_dir(dir)?;
            Arc::new(InMemoryIndex::build(embedder.as_ref(), passages).await?)
        }
        IndexBackend::Qdrant => Arc::new(
            QdrantIndex::connect(&config.index.qdrant_url, &config.index.collection).await?,
        ),
    };

    let retriever = CandidateRetriever::with_mode(embedder, index, config.search_mode())?;
    Ok(RetrievalPipeline::new(retriever, Reranker::new(encoder)))
}

fn metadata_line(candidate: &Candidate) -> String {
    candidate
        .passage
        .metadata
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_candidates(candidates: &[Candidate]) {
    for c in candidates {
        println!("{} {}", "Rank".bold(), c.initial_rank);
        println!("{}", c.passage.content);
        println!("{}", metadata_line(c).dimmed());
        println!("---");
    }
}

fn print_ranked(ranked: &[RankedCandidate]) {
    if ranked.is_empty() {
        println!("{}", "No matching slides.".yellow());
        return;
    }
    for r in ranked {
        println!(
            "{} {} | Score={} (was {})",
            "Rank".bold(),
            r.final_rank,
            format!("{:.4}", r.rerank_score_norm).green(),
            r.initial_rank()
        );
        println!("{}", r.content());
        println!("{}", metadata_line(&r.candidate).dimmed());
        println!("---");
    }
}

fn print_comparison(comparison: &RetrievalComparison) {
    println!("\n{}\n", "BEFORE RERANKING".cyan().bold());
    print_candidates(&comparison.candidates);
    println!("\n{}\n", "AFTER RERANKING".cyan().bold());
    print_ranked(&comparison.ranked);
}
