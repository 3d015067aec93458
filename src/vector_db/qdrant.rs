// Qdrant-backed vector index (read-only)
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors::VectorsOptions,
        with_payload_selector, with_vectors_selector, PointId, ScoredPoint, SearchPoints,
        Value as QdrantValue, Vectors, WithPayloadSelector, WithVectorsSelector,
    },
};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{check_k, IndexHit, VectorIndex};
use crate::errors::{Result, RetrievalError};
use crate::types::{Metadata, MetadataValue, Passage};

/// Payload key holding the passage text
const CONTENT_KEY: &str = "document";

/// Read-only view over one Qdrant collection populated by ingestion
pub struct QdrantIndex {
    client: QdrantClient,
    collection: String,
}

impl QdrantIndex {
    /// Connect and verify that `collection` exists
    pub async fn connect(url: &str, collection: &str) -> Result<Self> {
        Self::connect_inner(url, collection)
            .await
            .map_err(RetrievalError::index)
    }

    async fn connect_inner(url: &str, collection: &str) -> anyhow::Result<Self> {
        info!(url, collection, "Connecting to Qdrant");
        let client = QdrantClient::from_url(url)
            .build()
            .context("Failed to create Qdrant client")?;

        let collections = client
            .list_collections()
            .await
            .context("Failed to list collections")?;
        if !collections.collections.iter().any(|c| c.name == collection) {
            return Err(anyhow!("collection '{}' does not exist", collection));
        }

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn search(&self, vector: &[f32], k: usize, with_vectors: bool) -> Result<Vec<IndexHit>> {
        check_k(k)?;
        debug!(collection = %self.collection, k, with_vectors, "Searching Qdrant");

        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
                }),
                with_vectors: Some(WithVectorsSelector {
                    selector_options: Some(with_vectors_selector::SelectorOptions::Enable(
                        with_vectors,
                    )),
                }),
                ..Default::default()
            })
            .await
            .context("Failed to search points")
            .map_err(RetrievalError::index)?;

        response
            .result
            .into_iter()
            .map(|point| point_to_hit(point, with_vectors))
            .collect()
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        self.search(vector, k, false).await
    }

    async fn query_with_vectors(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        self.search(vector, k, true).await
    }

    async fn len(&self) -> Result<usize> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .context("Failed to get collection info")
            .map_err(RetrievalError::index)?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0) as usize)
    }
}

fn point_to_hit(point: ScoredPoint, with_vectors: bool) -> Result<IndexHit> {
    let id = point_id_to_string(&point.id);
    let mut payload = point.payload;

    // A point without text cannot be reranked; treat it as a corrupt index
    let content = payload
        .remove(CONTENT_KEY)
        .and_then(|v| qdrant_value_to_string(&v))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            RetrievalError::IndexUnavailable(format!("point {} has no '{}' payload", id, CONTENT_KEY))
        })?;

    let vector = if with_vectors {
        Some(dense_vector(point.vectors).ok_or_else(|| {
            RetrievalError::IndexUnavailable(format!("point {} returned without a dense vector", id))
        })?)
    } else {
        None
    };

    Ok(IndexHit {
        passage: Passage {
            id,
            content,
            metadata: payload_to_metadata(payload),
        },
        similarity: point.score,
        vector,
    })
}

// Helper functions for type conversions
fn payload_to_metadata(payload: HashMap<String, QdrantValue>) -> Metadata {
    payload
        .into_iter()
        .filter_map(|(key, value)| qdrant_to_metadata_value(&value).map(|v| (key, v)))
        .collect()
}

fn qdrant_to_metadata_value(value: &QdrantValue) -> Option<MetadataValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(MetadataValue::Text(s.clone())),
        Kind::IntegerValue(i) => Some(MetadataValue::Int(*i)),
        // Whole-number doubles come from loaders that write every number as f64
        Kind::DoubleValue(f) if f.fract() == 0.0 && f.is_finite() => Some(MetadataValue::Int(*f as i64)),
        _ => None,
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

fn dense_vector(vectors: Option<Vectors>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(vector) => Some(vector.data),
        _ => None,
    }
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| id.point_id_options.as_ref())
        .map(|options| match options {
            PointIdOptions::Num(n) => n.to_string(),
            PointIdOptions::Uuid(u) => u.clone(),
        })
        .unwrap_or_else(|| "unknown".to_string())
}
