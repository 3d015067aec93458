// Slide retrieval pipeline
//
// Two stages over a read-only corpus: vector search for candidates, then
// cross-encoder reranking with sigmoid-normalized scores.
//
// Components:
// - Retrieval: query embedding + nearest-neighbour search
// - Reranking: joint (query, passage) scoring and stable ordering
// - Pipeline: composition and the ready barrier
// - Context/Tool: rendering results for the agent

pub mod retrieval;
pub mod reranking;
pub mod context;
pub mod pipeline;
pub mod tool;

// Re-export key types
pub use retrieval::{CandidateRetriever, SearchMode};
pub use reranking::{CrossEncoder, Reranker};
pub use context::ContextBuilder;
pub use pipeline::{RetrievalParams, RetrievalPipeline, RetrievalService};
pub use tool::SlideTool;
