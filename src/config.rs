use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_THRESHOLD: f32 = 0.45;
pub const DEFAULT_MATCH_COUNT: usize = 8;
pub const DEFAULT_LOOSE_MATCH_COUNT: usize = 12;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which hosted model family serves embeddings and chat completions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    fn default_embedding_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "text-embedding-3-small",
            Provider::Gemini => "text-embedding-004",
        }
    }

    fn default_chat_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-2.0-flash",
        }
    }

    fn default_embedding_dim(&self) -> usize {
        match self {
            Provider::OpenAi => 1536,
            Provider::Gemini => 768,
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(anyhow::anyhow!("Unknown provider: {}", other)),
        }
    }
}

/// Which datastore holds the document chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Qdrant,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Supabase => "supabase",
            StoreBackend::Qdrant => "qdrant",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "supabase" | "postgres" | "pgvector" => Ok(StoreBackend::Supabase),
            "qdrant" => Ok(StoreBackend::Qdrant),
            other => Err(anyhow::anyhow!("Unknown chunk store: {}", other)),
        }
    }
}

/// Process-wide settings, read once at start-up and passed down explicitly
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,

    pub store: StoreBackend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub supabase_service_role: Option<String>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    pub embedding_model: String,
    pub chat_model: String,
    /// Expected embedding length; `None` skips the check
    pub embedding_dim: Option<usize>,

    /// Default maximum cosine distance for the strict pass
    pub match_threshold: f32,
    pub match_count: usize,
    pub loose_match_count: usize,

    pub owner: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::for_provider(Provider::OpenAi)
    }
}

impl Settings {
    /// Defaults for a provider with no credentials set
    pub fn for_provider(provider: Provider) -> Self {
        Settings {
            provider,
            openai_api_key: None,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            store: StoreBackend::Supabase,
            supabase_url: None,
            supabase_anon_key: None,
            supabase_service_role: None,
            qdrant_url: None,
            qdrant_api_key: None,
            qdrant_collection: "documents".to_string(),
            embedding_model: provider.default_embedding_model().to_string(),
            chat_model: provider.default_chat_model().to_string(),
            embedding_dim: Some(provider.default_embedding_dim()),
            match_threshold: DEFAULT_THRESHOLD,
            match_count: DEFAULT_MATCH_COUNT,
            loose_match_count: DEFAULT_LOOSE_MATCH_COUNT,
            owner: "Alp".to_string(),
        }
    }

    /// Create settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    ///
    /// Blank values count as unset. Missing credentials are not an error here,
    /// they are reported per request by [`Settings::missing_required`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("LLM_PROVIDER") {
            Some(v) => v.parse::<Provider>().context("Invalid LLM_PROVIDER")?,
            None => Provider::OpenAi,
        };
        let store = match get("CHUNK_STORE") {
            Some(v) => v.parse::<StoreBackend>().context("Invalid CHUNK_STORE")?,
            None => StoreBackend::Supabase,
        };

        let mut settings = Settings::for_provider(provider);
        settings.store = store;

        settings.openai_api_key = get("OPENAI_API_KEY");
        if let Some(url) = get("OPENAI_BASE_URL") {
            settings.openai_base_url = url;
        }
        settings.gemini_api_key = get("GEMINI_API_KEY");
        if let Some(url) = get("GEMINI_BASE_URL") {
            settings.gemini_base_url = url;
        }

        settings.supabase_url = get("SUPABASE_URL");
        settings.supabase_anon_key = get("SUPABASE_ANON_KEY");
        settings.supabase_service_role = get("SUPABASE_SERVICE_ROLE");
        settings.qdrant_url = get("QDRANT_URL");
        settings.qdrant_api_key = get("QDRANT_API_KEY");
        if let Some(collection) = get("QDRANT_COLLECTION") {
            settings.qdrant_collection = collection;
        }

        if let Some(model) = get("EMBEDDING_MODEL") {
            settings.embedding_model = model;
        }
        if let Some(model) = get("CHAT_MODEL") {
            settings.chat_model = model;
        }
        if let Some(dim) = get("EMBEDDING_DIM") {
            let dim: usize = parse_var("EMBEDDING_DIM", &dim)?;
            settings.embedding_dim = (dim > 0).then_some(dim);
        }

        if let Some(v) = get("MATCH_THRESHOLD") {
            settings.match_threshold = parse_var("MATCH_THRESHOLD", &v)?;
        }
        if let Some(v) = get("MATCH_COUNT") {
            settings.match_count = parse_var("MATCH_COUNT", &v)?;
        }
        if let Some(v) = get("LOOSE_MATCH_COUNT") {
            settings.loose_match_count = parse_var("LOOSE_MATCH_COUNT", &v)?;
        }
        if let Some(owner) = get("PORTFOLIO_OWNER") {
            settings.owner = owner;
        }

        Ok(settings)
    }

    /// Names of the required variables that are not set, in a stable order
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required_vars()
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name)
            .collect()
    }

    /// Like [`Settings::missing_required`], but a service role key stands in
    /// for the anon key
    pub fn missing_for_writes(&self) -> Vec<&'static str> {
        let has_service_role = self.supabase_service_role.is_some();
        self.missing_required()
            .into_iter()
            .filter(|name| !(*name == "SUPABASE_ANON_KEY" && has_service_role))
            .collect()
    }

    /// Presence of every credential the selected provider and store need
    pub fn required_vars(&self) -> Vec<(&'static str, bool)> {
        let mut vars = Vec::new();
        match self.provider {
            Provider::OpenAi => vars.push(("OPENAI_API_KEY", self.openai_api_key.is_some())),
            Provider::Gemini => vars.push(("GEMINI_API_KEY", self.gemini_api_key.is_some())),
        }
        match self.store {
            StoreBackend::Supabase => {
                vars.push(("SUPABASE_URL", self.supabase_url.is_some()));
                vars.push(("SUPABASE_ANON_KEY", self.supabase_anon_key.is_some()));
            }
            StoreBackend::Qdrant => vars.push(("QDRANT_URL", self.qdrant_url.is_some())),
        }
        vars
    }

    /// Key used for writes: the service role when available
    pub fn supabase_write_key(&self) -> Option<&str> {
        self.supabase_service_role
            .as_deref()
            .or(self.supabase_anon_key.as_deref())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: {:?}", name, value))
}
