//! SlideScout - slide retrieval for a course-assistant agent
//!
//! Turns a question into a ranked, scored list of slide passages.
//!
//! # Architecture
//!
//! - **Embedding**: query/passage vectors under an asymmetric role convention
//! - **Vector DB**: read-only nearest-neighbour search over the slide corpus
//! - **RAG**: candidate retrieval, cross-encoder reranking, the pipeline
//!   service and the agent-facing tool

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{Result, RetrievalError};
pub use types::{Candidate, Passage, RankedCandidate};

// Model and index backends
pub mod embedding;
pub mod vector_db;
pub mod corpus;

// Retrieval pipeline
pub mod rag;
pub use rag::{RetrievalPipeline, RetrievalService, SlideTool};

// Configuration and CLI
pub mod config;
pub mod cli;
