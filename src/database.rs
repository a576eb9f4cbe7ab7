use crate::embeddings::Embedding;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored slice of a source document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Citation name, e.g. `resume` or `project:chatbot`
    pub source: String,
    pub chunk: String,
    pub embedding: Embedding,
}

/// A chunk returned by a similarity search, with its cosine distance to the query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrievalHit {
    pub source: String,
    pub chunk: String,
    /// Lower is closer
    pub distance: f32,
}

/// How a search filters candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Keep only hits with `distance <= max_distance`
    Strict { max_distance: f32 },
    /// Nearest hits regardless of distance
    Loose,
}

impl SearchMode {
    pub fn max_distance(&self) -> Option<f32> {
        match self {
            SearchMode::Strict { max_distance } => Some(*max_distance),
            SearchMode::Loose => None,
        }
    }
}

/// Row identity reported by a probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRow {
    pub id: String,
    pub source: String,
}

/// Result of reading one stored row to check the store is usable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub ok: bool,
    pub error: Option<String>,
    pub first_emb_len: usize,
    pub row: Option<ProbeRow>,
    pub raw_type: String,
}

impl ProbeReport {
    pub fn failed(error: impl Into<String>) -> Self {
        ProbeReport {
            ok: false,
            error: Some(error.into()),
            first_emb_len: 0,
            row: None,
            raw_type: "undefined".to_string(),
        }
    }
}

/// Datastore holding document chunks with their embeddings
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Nearest chunks to `query`, ordered by distance ascending, at most `limit`
    async fn search(
        &self,
        query: &Embedding,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>>;

    /// Make the store ready to receive embeddings of `dimensions` length
    async fn prepare(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    /// Append chunks
    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<()>;

    /// Read one row and report what it looks like
    async fn probe(&self) -> ProbeReport;

    fn backend(&self) -> &'static str;
}

/// Format an embedding as a pgvector literal, e.g. `[0.1,0.2]`
pub fn vector_literal(embedding: &Embedding) -> String {
    format!(
        "[{}]",
        embedding
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Parse an embedding that may come back as a JSON array or as a
/// `[..]` / `(..)` string
pub fn parse_embedding_value(value: &serde_json::Value) -> Option<Vec<f32>> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.starts_with('[') && s.ends_with(']') {
                serde_json::from_str::<Vec<f32>>(s).ok()
            } else if s.starts_with('(') && s.ends_with(')') {
                s[1..s.len() - 1]
                    .split(',')
                    .map(|v| v.trim().parse::<f32>().ok())
                    .collect()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// JavaScript-style type name of a JSON value, for probe reports
pub fn json_type_name(value: Option<&serde_json::Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(serde_json::Value::Null) => "object",
        Some(serde_json::Value::Bool(_)) => "boolean",
        Some(serde_json::Value::Number(_)) => "number",
        Some(serde_json::Value::String(_)) => "string",
        Some(serde_json::Value::Array(_)) | Some(serde_json::Value::Object(_)) => "object",
    }
}
