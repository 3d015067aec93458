// Retrieval stage: embed the query, search the index, assign initial ranks
pub mod engine;
pub mod search_mode;

pub use engine::CandidateRetriever;
pub use search_mode::SearchMode;
