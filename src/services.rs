use crate::config::{Provider, Settings, StoreBackend};
use crate::database::ChunkStore;
use crate::embeddings::Embedder;
use crate::gemini::{GeminiClient, GeminiConfig};
use crate::llm::ChatModel;
use crate::openai::{OpenAiClient, OpenAiConfig};
use crate::qdrant::{QdrantConfig, QdrantStore};
use crate::rag::ChatService;
use crate::supabase::{SupabaseConfig, SupabaseStore};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Whether the store client may write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAccess {
    Read,
    Write,
}

/// Concrete clients selected by the settings
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn ChunkStore>,
    pub chat: Arc<dyn ChatModel>,
}

impl Services {
    /// Build the clients without contacting any service
    pub fn from_settings(settings: &Settings, access: StoreAccess) -> Result<Self> {
        let (embedder, chat): (Arc<dyn Embedder>, Arc<dyn ChatModel>) = match settings.provider {
            Provider::OpenAi => {
                let client = Arc::new(OpenAiClient::new(OpenAiConfig::from_settings(settings)));
                (client.clone() as Arc<dyn Embedder>, client as Arc<dyn ChatModel>)
            }
            Provider::Gemini => {
                let client = Arc::new(GeminiClient::new(GeminiConfig::from_settings(settings)));
                (client.clone() as Arc<dyn Embedder>, client as Arc<dyn ChatModel>)
            }
        };

        let store: Arc<dyn ChunkStore> = match settings.store {
            StoreBackend::Supabase => {
                let config = match access {
                    StoreAccess::Read => SupabaseConfig::from_settings(settings),
                    StoreAccess::Write => SupabaseConfig::for_ingest(settings),
                };
                Arc::new(SupabaseStore::new(config))
            }
            StoreBackend::Qdrant => Arc::new(
                QdrantStore::new(QdrantConfig::from_settings(settings))
                    .context("Failed to initialize Qdrant client")?,
            ),
        };

        Ok(Services {
            embedder,
            store,
            chat,
        })
    }

    pub fn into_chat_service(self, settings: Settings) -> ChatService {
        ChatService::new(settings, self.embedder, self.store, self.chat)
    }
}
