use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{message::Message, tool::ToolSpec};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Whether a completion request lets the model pick tools.
///
/// A turn asks twice: first with the registry offered and automatic tool
/// choice, then, after any tool results are in the history, with tools
/// withheld so the model answers from those results.
#[derive(Debug, Clone, Copy)]
pub enum ToolOffer<'a> {
    Auto(&'a [ToolSpec]),
    Withheld,
}

impl<'a> ToolOffer<'a> {
    pub fn tools(&self) -> &'a [ToolSpec] {
        match self {
            ToolOffer::Auto(tools) => tools,
            ToolOffer::Withheld => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("Input message too long. Message: {0}")]
    ContextLengthExceeded(String),
}

/// Base trait for chat-completion backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the given history
    async fn complete(
        &self,
        messages: &[Message],
        offer: ToolOffer<'_>,
    ) -> Result<(Message, Usage), ProviderError>;
}
