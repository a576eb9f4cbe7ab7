use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A hosted service that turns text into an [`Embedding`]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Model identifier, reported in diagnostics
    fn model(&self) -> &str;
}
