//! Vector search boundary.
//!
//! Lexiscope never embeds or searches itself. It only memoizes calls to an
//! external semantic search collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A ranked text chunk returned by vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    /// Relevance score (0.0–1.0).
    pub score: f32,
    /// Collection the chunk came from.
    pub source: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>, score: f32, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score,
            source: source.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Label shown in the context block: `metadata.source_type`, else the collection.
    pub fn label(&self) -> &str {
        self.metadata
            .get("source_type")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.source)
    }
}

/// Render chunks as numbered source blocks for prompt injection.
pub fn format_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Source {} - {}]:\n{}", i + 1, chunk.label(), chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// External semantic search over one or more collections.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Top `limit` chunks with `score >= min_score`, best first.
    async fn search(
        &self,
        query: &str,
        collections: &[String],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, FetchError>;
}
