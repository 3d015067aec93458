//! Passage types for the slide corpus
//!
//! A passage is one retrievable unit of slide content. Metadata values are
//! either text or integers; an absent key is simply absent, there is no null.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known metadata keys carried by slide passages
pub mod keys {
    pub const COURSE: &str = "course";
    pub const CHAPTER: &str = "chapter";
    pub const PAGE: &str = "page";
    pub const TITLE: &str = "title";
    pub const FILE: &str = "file";
}

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Passage metadata, ordered by key for stable serialization
pub type Metadata = BTreeMap<String, MetadataValue>;

/// An indexed unit of retrievable slide content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Passage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata insertion
    pub fn with_meta(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Look up a metadata value
    pub fn meta(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// Whether the passage satisfies the corpus invariant (non-blank content)
    pub fn is_indexable(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
