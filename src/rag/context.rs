// Context builder: renders ranked slides for the agent's tool output
use serde::{Deserialize, Serialize};

use crate::types::passage::keys;
use crate::types::{Passage, RankedCandidate};

const UNKNOWN: &str = "unknown";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum estimated tokens of slide content (None = unlimited)
    pub max_context_tokens: Option<usize>,
    /// Append the normalized rerank score to each line
    pub include_scores: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: None,
            include_scores: false,
        }
    }
}

/// Assembled context for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Number of slides included
    pub passage_count: usize,
    /// Estimated token count of included content
    pub estimated_tokens: usize,
    /// Passage IDs included, in rank order
    pub passage_ids: Vec<String>,
}

/// Context builder for the `retrieve_slides` tool output
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create new context builder with default config
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from ranked slides, best first
    pub fn build(&self, ranked: &[RankedCandidate]) -> AssembledContext {
        let mut lines = Vec::new();
        let mut total_tokens = 0;
        let mut included_ids = Vec::new();

        for item in ranked {
            // Rough estimate: ~4 chars per token
            let tokens = item.content().len() / 4;

            if let Some(max) = self.config.max_context_tokens {
                if total_tokens + tokens > max {
                    break;
                }
            }

            lines.push(self.format_slide(item));
            total_tokens += tokens;
            included_ids.push(item.passage().id.clone());
        }

        let mut text = String::from("Retrieved slides:\n");
        text.push_str(&lines.join("\n"));

        AssembledContext {
            text,
            passage_count: lines.len(),
            estimated_tokens: total_tokens,
            passage_ids: included_ids,
        }
    }

    fn format_slide(&self, item: &RankedCandidate) -> String {
        let passage = item.passage();
        let line = format!(
            "- {} ({}, Page {}): {}",
            meta_or_unknown(passage, keys::COURSE),
            meta_or_unknown(passage, keys::CHAPTER),
            meta_or_unknown(passage, keys::PAGE),
            passage.content
        );

        if self.config.include_scores {
            format!("{} [relevance {:.2}]", line, item.rerank_score_norm)
        } else {
            line
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn meta_or_unknown(passage: &Passage, key: &str) -> String {
    passage
        .meta(key)
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
