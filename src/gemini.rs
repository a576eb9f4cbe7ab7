use crate::config::Settings;
use crate::embeddings::{Embedder, Embedding};
use crate::llm::{ChatMessage, ChatModel, Role};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for Gemini API
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl GeminiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        GeminiConfig {
            api_key: settings.gemini_api_key.clone().unwrap_or_default(),
            base_url: settings.gemini_base_url.trim_end_matches('/').to_string(),
            embedding_model: settings.embedding_model.clone(),
            chat_model: settings.chat_model.clone(),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::new();
        GeminiClient { config, client }
    }

    async fn post<T, R>(&self, url: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        // The key travels in a header and URLs are dropped from transport errors
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed: {} {}",
                status,
                error_text
            ));
        }

        Ok(response.json().await.map_err(reqwest::Error::without_url)?)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            content: Content<'a>,
        }

        let request = EmbeddingRequest {
            content: Content {
                parts: vec![Part { text }],
                role: None,
            },
        };

        let url = self
            .config
            .model_url(&self.config.embedding_model, "embedContent");
        let response: EmbeddingResponse = self.post(&url, &request).await?;

        Ok(Embedding {
            values: response.embedding.map(|e| e.values).unwrap_or_default(),
        })
    }

    fn model(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    /// System messages become the system instruction, user messages the contents
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let system_parts: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part { text: &m.content })
            .collect();

        let contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| Content {
                parts: vec![Part { text: &m.content }],
                role: Some("user"),
            })
            .collect();

        let request = GenerateRequest {
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                parts: system_parts,
                role: None,
            }),
            contents,
            generation_config: GenerationConfig {
                temperature,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        debug!(
            "Requesting completion from {} with {} messages",
            self.config.chat_model,
            messages.len()
        );

        let url = self
            .config
            .model_url(&self.config.chat_model, "generateContent");
        let response: GenerateResponse = self.post(&url, &request).await?;

        // Concatenate all text parts of the first candidate
        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: Option<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}
