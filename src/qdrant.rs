use crate::config::Settings;
use crate::database::{ChunkStore, DocumentChunk, ProbeReport, ProbeRow, RetrievalHit, SearchMode};
use crate::embeddings::Embedding;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;

/// Configuration for Qdrant
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

impl QdrantConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        QdrantConfig {
            url: settings
                .qdrant_url
                .clone()
                .unwrap_or_else(|| "http://localhost:6334".to_string()),
            api_key: settings.qdrant_api_key.clone(),
            collection: settings.qdrant_collection.clone(),
        }
    }
}

/// Chunk store backed by a single Qdrant cosine collection
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Create a new Qdrant client; no connection is made until the first call
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder.build()?;

        Ok(QdrantStore {
            client,
            collection: config.collection,
        })
    }

    async fn point_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .with_context(|| format!("Failed to count points in {}", self.collection))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn vector_size(&self) -> Result<Option<u64>> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .with_context(|| format!("Failed to read collection {}", self.collection))?;

        Ok(info
            .result
            .and_then(|i| i.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|kind| match kind {
                VectorsConfigKind::Params(params) => Some(params.size),
                VectorsConfigKind::ParamsMap(_) => None,
            }))
    }

    async fn first_row(&self) -> Result<Option<ProbeRow>> {
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .limit(1)
                    .with_payload(true),
            )
            .await
            .with_context(|| format!("Failed to scroll collection {}", self.collection))?;

        Ok(response.result.into_iter().next().map(|point| ProbeRow {
            id: point.id.map(|id| format_point_id(&id)).unwrap_or_default(),
            source: point
                .payload
                .get("source")
                .and_then(|v| v.as_str())
                .cloned()
                .unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn search(
        &self,
        query: &Embedding,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let mut request =
            SearchPointsBuilder::new(&self.collection, query.values.clone(), limit as u64)
                .with_payload(true);
        if let Some(max_distance) = mode.max_distance() {
            request = request.score_threshold(score_threshold(max_distance));
        }

        let search_response = self
            .client
            .search_points(request)
            .await
            .with_context(|| format!("Failed to search collection {}", self.collection))?;

        debug!(
            "Qdrant returned {} points for {:?}",
            search_response.result.len(),
            mode
        );

        let hits = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let chunk = payload.get("chunk")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .cloned()
                    .unwrap_or_default();

                Some(RetrievalHit {
                    source,
                    chunk,
                    distance: distance_from_score(scored_point.score),
                })
            })
            .collect();

        Ok(hits)
    }

    async fn prepare(&self, dimensions: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .context("Failed to check collection existence")?;
        if exists {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ),
            )
            .await
            .with_context(|| format!("Failed to create collection {}", self.collection))?;

        info!(
            "Created collection {} with {} dimensions",
            self.collection, dimensions
        );
        Ok(())
    }

    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        // Numeric ids continue after the points already stored
        let first_id = self.point_count().await?;

        let points: Vec<PointStruct> = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let payload: HashMap<String, Value> = HashMap::from([
                    ("source".to_string(), Value::from(chunk.source.clone())),
                    ("chunk".to_string(), Value::from(chunk.chunk.clone())),
                ]);

                PointStruct::new(
                    first_id + idx as u64,
                    chunk.embedding.values.clone(),
                    payload,
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .with_context(|| {
                format!("Failed to upsert points in collection {}", self.collection)
            })?;

        Ok(())
    }

    async fn probe(&self) -> ProbeReport {
        let row = match self.first_row().await {
            Ok(row) => row,
            Err(e) => return ProbeReport::failed(format!("{:#}", e)),
        };

        let first_emb_len = if row.is_some() {
            match self.vector_size().await {
                Ok(size) => size.unwrap_or(0) as usize,
                Err(e) => return ProbeReport::failed(format!("{:#}", e)),
            }
        } else {
            0
        };

        ProbeReport {
            ok: true,
            error: None,
            first_emb_len,
            raw_type: if row.is_some() { "object" } else { "undefined" }.to_string(),
            row,
        }
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

fn format_point_id(id: &PointId) -> String {
    match &id.point_id_options {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        None => String::new(),
    }
}

/// Minimum cosine similarity score admitting hits within `max_distance`
fn score_threshold(max_distance: f32) -> f32 {
    1.0 - max_distance
}

/// Cosine distance of a similarity score: lower is closer
fn distance_from_score(score: f32) -> f32 {
    1.0 - score
}
