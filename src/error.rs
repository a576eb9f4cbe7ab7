use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde::Serialize;
use thiserror::Error;

/// Failures a chat request can end in, one per pipeline stage
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Missing configuration: {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    #[error("Missing question")]
    Input,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Search failed: {0}")]
    Retrieval(String),

    #[error("Chat completion failed: {0}")]
    Generation(String),

    #[error("Unhandled error: {0}")]
    Unhandled(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Input => StatusCode::BAD_REQUEST,
            ChatError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable category
    pub fn category(&self) -> &'static str {
        match self {
            ChatError::Configuration(_) => "Missing configuration",
            ChatError::Input => "Missing question",
            ChatError::Embedding(_) => "Embedding failed",
            ChatError::Retrieval(_) => "Search failed",
            ChatError::Generation(_) => "Chat completion failed",
            ChatError::Unhandled(_) => "Unhandled error",
            ChatError::MethodNotAllowed => "Method Not Allowed",
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            ChatError::Configuration(missing) => Some(missing.join(", ")),
            ChatError::Embedding(d)
            | ChatError::Retrieval(d)
            | ChatError::Generation(d)
            | ChatError::Unhandled(d) => Some(d.clone()),
            ChatError::Input | ChatError::MethodNotAllowed => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.category(),
            details: self.details(),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
