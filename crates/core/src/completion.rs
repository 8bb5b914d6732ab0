//! Completion capability: the abstraction over the text-completion API.
//!
//! A completion client sends one flat prompt (the whole conversation,
//! rendered as alternating `Human:` / `Assistant:` turns) and gets back the
//! generated continuation plus the reason generation stopped.
//!
//! The engine never talks HTTP itself; it only needs `complete()`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::CompletionError;

/// Prefix of every human turn in a rendered conversation.
pub const PREFIX_HUMAN: &str = "Human: ";

/// Prefix of every assistant turn in a rendered conversation.
pub const PREFIX_AI: &str = "Assistant: ";

/// One request to the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "claude-v1")
    pub model: String,

    /// The fully rendered prompt text
    pub prompt: String,

    /// Sequences that end generation. Always the two turn prefixes, so the
    /// model cannot forge a turn boundary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to sample for this request
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Build a request with the standard turn-prefix stop sequences.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stop_sequences: vec![PREFIX_HUMAN.to_string(), PREFIX_AI.to_string()],
            temperature,
            max_tokens,
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Hit one of the stop sequences (a natural turn end)
    StopSequence,
    /// Ran out of `max_tokens`; the answer is truncated
    MaxTokens,
    /// Anything else the API reports
    #[serde(untagged)]
    Other(String),
}

impl StopReason {
    /// Parse the API's textual stop reason.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop_sequence" => Self::StopSequence,
            "max_tokens" => Self::MaxTokens,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the reply was cut off by the token limit.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::MaxTokens)
    }
}

/// Token usage information, when the API reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A single completion chunk from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,

    /// Why generation stopped
    pub stop_reason: StopReason,

    /// Token accounting, if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// A complete (non-truncated) response.
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop_reason: StopReason::StopSequence,
            usage: None,
        }
    }

    /// A response cut off by the token limit.
    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop_reason: StopReason::MaxTokens,
            usage: None,
        }
    }
}

/// The core completion trait.
///
/// The conversation engine calls `complete()` once per underlying request
/// without knowing which backend (HTTP API, scripted stub) answers it.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// A human-readable name for this client (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send one request and get one completion chunk.
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, CompletionError>;
}
