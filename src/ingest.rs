use crate::chunking::{split_into_chunks, MAX_CHUNK_CHARS};
use crate::database::{ChunkStore, DocumentChunk};
use crate::document::{discover_documents, Document};
use crate::embeddings::Embedder;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Offline batch: read documents, chunk, embed, store
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    embedding_dim: Option<usize>,
    max_chunk_chars: usize,
}

/// Chunks written per source, in processing order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestSummary {
    pub sources: Vec<(String, usize)>,
}

impl IngestSummary {
    pub fn total_chunks(&self) -> usize {
        self.sources.iter().map(|(_, n)| n).sum()
    }
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        embedding_dim: Option<usize>,
    ) -> Self {
        Ingestor {
            embedder,
            store,
            embedding_dim,
            max_chunk_chars: MAX_CHUNK_CHARS,
        }
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    /// Ingest every supported document under `data_dir`
    pub async fn ingest_dir<P: AsRef<Path>>(&self, data_dir: P) -> Result<IngestSummary> {
        let data_dir = data_dir.as_ref();
        let files = discover_documents(data_dir)?;
        if files.is_empty() {
            warn!("No documents found in {}", data_dir.display());
        }

        let mut summary = IngestSummary::default();
        for (path, source) in files {
            let document = Document::from_file(&path, &source)
                .with_context(|| format!("Failed to process document {}", path.display()))?;
            let count = self.ingest_document(&document).await?;
            summary.sources.push((source, count));
        }

        info!("✅ Ingest complete: {} chunks", summary.total_chunks());
        Ok(summary)
    }

    /// Chunk, embed and store one document; returns the number of chunks written
    pub async fn ingest_document(&self, document: &Document) -> Result<usize> {
        let chunks = split_into_chunks(&document.content, &document.source, self.max_chunk_chars);
        if chunks.is_empty() {
            warn!("{}: no text to ingest", document.source);
            return Ok(0);
        }

        // Sequential, one request per chunk
        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self
                .embedder
                .embed(&chunk.text)
                .await
                .with_context(|| format!("Failed to embed chunk of {}", document.source))?;

            if let Some(expected) = self.embedding_dim {
                if embedding.len() != expected {
                    return Err(anyhow::anyhow!(
                        "Embedding dim mismatch: got {}, expected {}",
                        embedding.len(),
                        expected
                    ));
                }
            } else if embedding.is_empty() {
                return Err(anyhow::anyhow!(
                    "Embedding service returned an empty vector for {}",
                    document.source
                ));
            }

            rows.push(DocumentChunk {
                source: chunk.source,
                chunk: chunk.text,
                embedding,
            });
        }

        self.store.prepare(rows[0].embedding.len()).await?;
        self.store
            .insert(&rows)
            .await
            .with_context(|| format!("Failed to store chunks of {}", document.source))?;

        info!("✓ {}: {} chunks", document.source, rows.len());
        Ok(rows.len())
    }
}
