use crate::error::ChatError;
use crate::rag::{ChatRequest, ChatResponse, ChatService};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub const CHAT_ROUTE: &str = "/api/chat";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

impl AppState {
    pub fn new(service: ChatService) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}

/// Router exposing the chat endpoint and a health alias
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            CHAT_ROUTE,
            get(chat_info)
                .post(chat)
                .options(preflight)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route("/health", get(chat_info))
        .with_state(state)
        .layer(cors)
}

/// Bind and serve until the process is stopped
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}{}", listener.local_addr()?, CHAT_ROUTE);

    axum::serve(listener, app_router(state))
        .await
        .context("Server error")?;
    Ok(())
}

/// POST: answer a question
async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatResponse>, ChatError> {
    // Unparseable bodies are treated as carrying no question
    let body: Value = serde_json::from_slice(&body).unwrap_or_default();
    let request = ChatRequest::from_json(&body);

    // Run on its own task so a panic becomes an error response
    let service = state.service.clone();
    tokio::spawn(async move { service.answer(request).await })
        .await
        .map_err(|e| ChatError::Unhandled(e.to_string()))?
        .map(Json)
}

/// GET: static info, reports which credentials are present but never their values
async fn chat_info(State(state): State<AppState>) -> Json<Value> {
    let settings = state.service.settings();
    let env: serde_json::Map<String, Value> = settings
        .required_vars()
        .into_iter()
        .map(|(name, present)| (name.to_string(), Value::Bool(present)))
        .collect();

    Json(json!({
        "ok": true,
        "route": CHAT_ROUTE,
        "methods": ["POST", "GET", "OPTIONS"],
        "provider": settings.provider.as_str(),
        "store": settings.store.as_str(),
        "models": {
            "embedding": settings.embedding_model,
            "chat": settings.chat_model,
        },
        "env": env,
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ChatError {
    ChatError::MethodNotAllowed
}
