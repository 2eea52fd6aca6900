//! # Completion Interface
//!
//! A trait-based abstraction over the LLM completion endpoint. The core
//! only needs one operation - conversation in, completion text out - so the
//! trait stays that narrow. Rate limiting is surfaced as its own error kind
//! so the agent loop can retry it; nothing in this module retries.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolsmith_error::Result;

/// A chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// The completion client trait.
///
/// Implementations map their transport failures onto `InferenceFailed` and
/// `RateLimited`; the latter is the only kind the agent loop retries.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the conversation and return the completion text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
