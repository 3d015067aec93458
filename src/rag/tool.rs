// Agent-facing `retrieve_slides` tool
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::errors::{Result, RetrievalError};
use crate::rag::context::{AssembledContext, ContextBuilder};
use crate::rag::pipeline::{RetrievalParams, RetrievalService};

pub const TOOL_NAME: &str = "retrieve_slides";
pub const TOOL_DESCRIPTION: &str =
    "Retrieve information from educational slides related to a query.";

/// The single call the conversational agent makes into retrieval
pub struct SlideTool {
    service: Arc<RetrievalService>,
    params: RetrievalParams,
    context: ContextBuilder,
}

impl SlideTool {
    pub fn new(service: Arc<RetrievalService>, params: RetrievalParams) -> Self {
        Self {
            service,
            params,
            context: ContextBuilder::new(),
        }
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn name(&self) -> &'static str {
        TOOL_NAME
    }

    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Run retrieval and render the slides for the agent
    pub async fn call(&self, query: &str) -> Result<String> {
        Ok(self.call_detailed(query).await?.text)
    }

    /// Like `call`, keeping the assembly details
    pub async fn call_detailed(&self, query: &str) -> Result<AssembledContext> {
        let ranked = self
            .service
            .answer_context(query, self.params.initial_k, self.params.final_n)
            .await?;
        info!(tool = TOOL_NAME, results = ranked.len(), "Slides retrieved");
        Ok(self.context.build(&ranked))
    }

    /// Entry point for tool-call arguments as emitted by an LLM.
    ///
    /// Accepts a bare string or an object with a string `query` field.
    pub async fn call_json(&self, args: &Value) -> Result<String> {
        let query = extract_query(args)?;
        self.call(query).await
    }
}

fn extract_query(args: &Value) -> Result<&str> {
    match args {
        Value::String(s) => Ok(s.as_str()),
        Value::Object(map) => match map.get("query") {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(RetrievalError::InvalidQuery(format!(
                "query must be a string, got {}",
                other
            ))),
            None => Err(RetrievalError::InvalidQuery(
                "tool arguments have no 'query' field".to_string(),
            )),
        },
        other => Err(RetrievalError::InvalidQuery(format!(
            "query must be a string, got {}",
            other
        ))),
    }
}
