use crate::config::Settings;
use crate::embeddings::{Embedder, Embedding};
use crate::llm::{ChatMessage, ChatModel};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Configuration for the OpenAI API
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl OpenAiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        OpenAiConfig {
            api_key: settings.openai_api_key.clone().unwrap_or_default(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            embedding_model: settings.embedding_model.clone(),
            chat_model: settings.chat_model.clone(),
        }
    }
}

/// Client for the OpenAI embeddings and chat-completions endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAiClient { config, client }
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(anyhow::anyhow!("API request failed: {} {}", status, detail));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a str,
        }

        debug!(
            "Embedding {} chars with {}",
            text.len(),
            self.config.embedding_model
        );

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self.post("embeddings", &request).await?;

        // An empty data array is passed through as an empty vector
        let values = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();

        Ok(Embedding { values })
    }

    fn model(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            temperature: f32,
            messages: &'a [ChatMessage],
        }

        debug!(
            "Requesting completion from {} with {} messages",
            self.config.chat_model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.config.chat_model,
            temperature,
            messages,
        };

        let response: ChatResponse = self.post("chat/completions", &request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    message: String,
}
