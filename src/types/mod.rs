//! Type definitions module
//!
//! Core types flowing through the retrieval pipeline: indexed passages and
//! their per-query candidate and ranked forms.

pub mod passage;

// Re-export commonly used types
pub use passage::{Metadata, MetadataValue, Passage};

// Per-query ranking types
pub mod candidate;
pub use candidate::{Candidate, RankedCandidate};
