// Reranking stage: joint (query, passage) scoring with a cross-encoder
pub mod cross_encoder;
pub mod scorer;

pub use cross_encoder::{BgeCrossEncoder, CrossEncoder};
pub use scorer::{sigmoid, Reranker};
