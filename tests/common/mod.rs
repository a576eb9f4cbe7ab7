#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use portfolio_rag::config::Settings;
use portfolio_rag::database::{
    ChunkStore, DocumentChunk, ProbeReport, RetrievalHit, SearchMode,
};
use portfolio_rag::embeddings::{Embedder, Embedding};
use portfolio_rag::llm::{ChatMessage, ChatModel};
use portfolio_rag::rag::ChatService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIM: usize = 3;

/// Settings with every credential present and a small embedding dimension
pub fn configured_settings() -> Settings {
    let mut settings = Settings::default();
    settings.openai_api_key = Some("sk-test".into());
    settings.supabase_url = Some("http://supabase.test".into());
    settings.supabase_anon_key = Some("anon".into());
    settings.embedding_dim = Some(DIM);
    settings
}

pub fn hit(source: &str, chunk: &str, distance: f32) -> RetrievalHit {
    RetrievalHit {
        source: source.to_string(),
        chunk: chunk.to_string(),
        distance,
    }
}

pub struct StubEmbedder {
    pub values: Vec<f32>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn new(values: Vec<f32>) -> Self {
        StubEmbedder {
            values,
            fail: false,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        StubEmbedder {
            fail: true,
            ..Self::new(vec![0.1; DIM])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(vec![0.1; DIM])
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(anyhow::anyhow!("embedding backend unavailable"));
        }
        Ok(Embedding::new(self.values.clone()))
    }

    fn model(&self) -> &str {
        "stub-embedding"
    }
}

#[derive(Default)]
pub struct StubStore {
    pub strict: Vec<RetrievalHit>,
    pub loose: Vec<RetrievalHit>,
    pub fail: bool,
    pub searches: Mutex<Vec<(SearchMode, usize)>>,
    pub inserted: Mutex<Vec<DocumentChunk>>,
    pub prepared: Mutex<Vec<usize>>,
}

impl StubStore {
    pub fn with_hits(strict: Vec<RetrievalHit>, loose: Vec<RetrievalHit>) -> Self {
        StubStore {
            strict,
            loose,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        StubStore {
            fail: true,
            ..Default::default()
        }
    }

    pub fn searches(&self) -> Vec<(SearchMode, usize)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn inserted(&self) -> Vec<DocumentChunk> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChunkStore for StubStore {
    async fn search(
        &self,
        _query: &Embedding,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RetrievalHit>> {
        self.searches.lock().unwrap().push((mode, limit));
        if self.fail {
            return Err(anyhow::anyhow!("connection refused"));
        }
        let rows = match mode {
            SearchMode::Strict { .. } => &self.strict,
            SearchMode::Loose => &self.loose,
        };
        Ok(rows.iter().take(limit).cloned().collect())
    }

    async fn prepare(&self, dimensions: usize) -> Result<()> {
        self.prepared.lock().unwrap().push(dimensions);
        Ok(())
    }

    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<()> {
        if self.fail {
            return Err(anyhow::anyhow!("insert rejected"));
        }
        self.inserted.lock().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn probe(&self) -> ProbeReport {
        ProbeReport::failed("not implemented by stub")
    }

    fn backend(&self) -> &'static str {
        "stub"
    }
}

pub struct StubChat {
    pub answer: String,
    pub fail: bool,
    pub panic: bool,
    pub calls: AtomicUsize,
    pub last_messages: Mutex<Vec<ChatMessage>>,
    pub last_temperature: Mutex<Option<f32>>,
}

impl StubChat {
    pub fn answering(answer: &str) -> Self {
        StubChat {
            answer: answer.to_string(),
            fail: false,
            panic: false,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
            last_temperature: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        StubChat {
            fail: true,
            ..Self::answering("")
        }
    }

    /// A model whose call panics instead of returning
    pub fn panicking() -> Self {
        StubChat {
            panic: true,
            ..Self::answering("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for StubChat {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        *self.last_temperature.lock().unwrap() = Some(temperature);
        if self.panic {
            panic!("chat model crashed");
        }
        if self.fail {
            return Err(anyhow::anyhow!("model overloaded"));
        }
        Ok(self.answer.clone())
    }

    fn model(&self) -> &str {
        "stub-chat"
    }
}

/// Stubs shared with the service so tests can inspect them afterwards
pub struct Harness {
    pub embedder: Arc<StubEmbedder>,
    pub store: Arc<StubStore>,
    pub chat: Arc<StubChat>,
    pub service: ChatService,
}

impl Harness {
    pub fn new(settings: Settings, embedder: StubEmbedder, store: StubStore, chat: StubChat) -> Self {
        let embedder = Arc::new(embedder);
        let store = Arc::new(store);
        let chat = Arc::new(chat);
        let service = ChatService::new(settings, embedder.clone(), store.clone(), chat.clone());
        Harness {
            embedder,
            store,
            chat,
            service,
        }
    }

    pub fn external_calls(&self) -> usize {
        self.embedder.calls() + self.store.searches().len() + self.chat.calls()
    }
}
