use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of a chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A hosted chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation and return the answer text (possibly empty)
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;

    /// Model identifier, reported in diagnostics
    fn model(&self) -> &str;
}
