//! Chunk store backed by Supabase: Postgres with pgvector behind PostgREST.
//!
//! Retrieval goes through the `match_documents` function shipped in
//! `sql/match_documents.sql`; rows live in the `documents` table.

use crate::config::Settings;
use crate::database::{
    json_type_name, parse_embedding_value, vector_literal, ChunkStore, DocumentChunk, ProbeReport,
    ProbeRow, RetrievalHit, SearchMode,
};
use crate::embeddings::Embedding;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde_json::json;

const TABLE: &str = "documents";
const MATCH_FUNCTION: &str = "match_documents";

/// Configuration for Supabase
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
}

impl SupabaseConfig {
    /// Read-only access with the anon key
    pub fn from_settings(settings: &Settings) -> Self {
        SupabaseConfig {
            url: settings
                .supabase_url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: settings.supabase_anon_key.clone().unwrap_or_default(),
        }
    }

    /// Write access, preferring the service role key
    pub fn for_ingest(settings: &Settings) -> Self {
        SupabaseConfig {
            api_key: settings.supabase_write_key().unwrap_or_default().to_string(),
            ..Self::from_settings(settings)
        }
    }
}

/// Client for the Supabase REST API
pub struct SupabaseStore {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        let client = reqwest::Client::new();
        SupabaseStore { config, client }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.rest_url(path))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        // PostgREST errors carry a `message` field
        let detail = serde_json::from_str::<serde_json::Value>(&error_text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(error_text);
        Err(anyhow::anyhow!("Supabase request failed: {} {}", status, detail))
    }

    async fn first_row(&self) -> Result<Option<serde_json::Value>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("{}?select=id,source,chunk,embedding&limit=1", TABLE),
            )
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ChunkStore for SupabaseStore {
    async fn search(
        &self,
        query: &Embedding,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let body = json!({
            "query_embedding": vector_literal(query),
            "match_count": limit,
            "max_distance": mode.max_distance(),
        });

        debug!("Calling {} with {:?} limit {}", MATCH_FUNCTION, mode, limit);

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("rpc/{}", MATCH_FUNCTION),
            )
            .json(&body)
            .send()
            .await
            .context("Failed to reach Supabase")?;

        let hits: Vec<RetrievalHit> = Self::check(response)
            .await?
            .json()
            .await
            .context("Unexpected match_documents response")?;

        Ok(hits)
    }

    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<()> {
        #[derive(Serialize)]
        struct Row<'a> {
            source: &'a str,
            chunk: &'a str,
            embedding: String,
        }

        if chunks.is_empty() {
            return Ok(());
        }

        let rows: Vec<Row> = chunks
            .iter()
            .map(|c| Row {
                source: &c.source,
                chunk: &c.chunk,
                embedding: vector_literal(&c.embedding),
            })
            .collect();

        let response = self
            .request(reqwest::Method::POST, TABLE)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .context("Failed to reach Supabase")?;
        Self::check(response)
            .await
            .with_context(|| format!("Failed to insert {} rows into {}", rows.len(), TABLE))?;

        Ok(())
    }

    async fn probe(&self) -> ProbeReport {
        let row = match self.first_row().await {
            Ok(row) => row,
            Err(e) => return ProbeReport::failed(format!("{:#}", e)),
        };

        let embedding = row.as_ref().and_then(|r| r.get("embedding"));
        let first_emb_len = embedding
            .and_then(parse_embedding_value)
            .map(|v| v.len())
            .unwrap_or(0);

        ProbeReport {
            ok: true,
            error: None,
            first_emb_len,
            row: row.as_ref().map(|r| ProbeRow {
                id: match r.get("id") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
                source: r
                    .get("source")
                    .and_then(|s| s.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }),
            raw_type: json_type_name(embedding).to_string(),
        }
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}
