use crate::config::Settings;
use crate::context::{assemble_context, build_messages};
use crate::database::{ChunkStore, RetrievalHit, SearchMode};
use crate::embeddings::Embedder;
use crate::error::ChatError;
use crate::llm::ChatModel;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Answer returned when neither retrieval pass finds anything
pub const NO_MATCH_ANSWER: &str = "No matching documents found in my knowledge base yet.";

/// Answer substituted when the model returns empty text
pub const EMPTY_ANSWER_FALLBACK: &str = "Sorry, I could not generate a response.";

pub const TEMPERATURE: f32 = 0.2;
pub const MAX_K: usize = 50;
/// Cosine distance never exceeds 2
pub const MAX_THRESHOLD: f32 = 2.0;

/// Field names tried, in order, when looking for the question in a body
const QUESTION_FIELDS: [&str; 4] = ["question", "q", "message", "prompt"];

/// Number of raw distances reported in diagnostics
const TOP_DISTANCES: usize = 3;

/// A question with optional retrieval overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    pub threshold: Option<f32>,
    pub k: Option<usize>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        ChatRequest {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Extract a request from an arbitrary JSON body.
    ///
    /// Anything that is not an object carries no question. Numbers may also
    /// arrive as numeric strings.
    pub fn from_json(body: &serde_json::Value) -> Self {
        let Some(fields) = body.as_object() else {
            return ChatRequest::default();
        };

        let question = QUESTION_FIELDS
            .iter()
            .filter_map(|name| fields.get(*name).and_then(|v| v.as_str()))
            .find(|q| !q.trim().is_empty())
            .unwrap_or_default()
            .to_string();

        let number = |name: &str| -> Option<f64> {
            match fields.get(name)? {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };

        ChatRequest {
            question,
            threshold: number("threshold")
                .filter(|t| t.is_finite())
                .map(|t| t as f32),
            k: number("k")
                .filter(|k| k.is_finite() && *k >= 1.0)
                .map(|k| k as usize),
        }
    }
}

/// Debugging metadata attached to every successful answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub used_context: bool,
    pub used_loose: bool,
    pub threshold: f32,
    pub k: usize,
    pub loose_k: usize,
    pub embedding_model: String,
    pub chat_model: String,
    pub top_distances: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub diag: Diagnostics,
}

/// Retrieval-augmented answering over injected service clients
pub struct ChatService {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    chat: Arc<dyn ChatModel>,
}

impl ChatService {
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        ChatService {
            settings,
            embedder,
            store,
            chat,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one request through validate, embed, retrieve, generate
    pub async fn answer(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let missing = self.settings.missing_required();
        if !missing.is_empty() {
            return Err(ChatError::Configuration(missing));
        }

        let question = request.question.trim();
        if question.is_empty() {
            return Err(ChatError::Input);
        }

        let k = request
            .k
            .unwrap_or(self.settings.match_count)
            .clamp(1, MAX_K);
        let threshold = request
            .threshold
            .unwrap_or(self.settings.match_threshold)
            .clamp(0.0, MAX_THRESHOLD);
        let loose_k = k.max(self.settings.loose_match_count);

        debug!(
            "Question of {} chars, k={}, threshold={}",
            question.chars().count(),
            k,
            threshold
        );

        // Embed the question
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| ChatError::Embedding(format!("{:#}", e)))?;
        if embedding.is_empty() {
            return Err(ChatError::Embedding(
                "embedding service returned an empty vector".to_string(),
            ));
        }
        if let Some(expected) = self.settings.embedding_dim {
            if embedding.len() != expected {
                return Err(ChatError::Embedding(format!(
                    "embedding dimension mismatch: got {}, expected {}",
                    embedding.len(),
                    expected
                )));
            }
        }

        // Strict pass, then one loose pass if nothing passed the threshold
        let mut hits = self
            .store
            .search(
                &embedding,
                SearchMode::Strict {
                    max_distance: threshold,
                },
                k,
            )
            .await
            .map_err(|e| ChatError::Retrieval(format!("{:#}", e)))?;
        hits.retain(|hit| hit.distance <= threshold);

        let mut used_loose = false;
        if hits.is_empty() {
            warn!(
                "No chunks within distance {}, retrying without threshold",
                threshold
            );
            used_loose = true;
            hits = self
                .store
                .search(&embedding, SearchMode::Loose, loose_k)
                .await
                .map_err(|e| ChatError::Retrieval(format!("{:#}", e)))?;
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        let diag = Diagnostics {
            used_context: !hits.is_empty(),
            used_loose,
            threshold,
            k,
            loose_k,
            embedding_model: self.embedder.model().to_string(),
            chat_model: self.chat.model().to_string(),
            top_distances: hits.iter().take(TOP_DISTANCES).map(|h| h.distance).collect(),
        };

        if hits.is_empty() {
            info!("No matching documents for question");
            return Ok(ChatResponse {
                answer: NO_MATCH_ANSWER.to_string(),
                sources: Vec::new(),
                diag,
            });
        }

        // Generate the grounded answer
        let context = assemble_context(&hits);
        let messages = build_messages(&self.settings.owner, &context, question);

        let answer = self
            .chat
            .complete(&messages, TEMPERATURE)
            .await
            .map_err(|e| ChatError::Generation(format!("{:#}", e)))?;

        let answer = if answer.trim().is_empty() {
            warn!("Chat model returned an empty answer");
            EMPTY_ANSWER_FALLBACK.to_string()
        } else {
            answer
        };

        let sources = sources_of(&hits);
        info!(
            "Answered with {} sources (loose: {})",
            sources.len(),
            used_loose
        );

        Ok(ChatResponse {
            answer,
            sources,
            diag,
        })
    }
}

fn sources_of(hits: &[RetrievalHit]) -> Vec<String> {
    hits.iter().map(|hit| hit.source.clone()).collect()
}
