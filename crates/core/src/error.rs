//! Error types for the MissionClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all MissionClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion errors ---
    #[error("Completion failed: {0}")]
    CompletionFailed(#[from] CompletionError),

    // --- Knowledge errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Retry budget ---
    #[error("{0}")]
    RetryExhausted(#[from] RetryExhausted),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A single completion request failed. No partial answer is salvaged.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("API rejected the request: {0}")]
    Rejected(String),

    #[error("Rate limited by the completion API, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The shared retry budget ran out before a request succeeded.
#[derive(Debug, Clone, Error)]
#[error("gave up after {attempts} failed attempts: {last_error}")]
pub struct RetryExhausted {
    /// Failed attempts made by this caller
    pub attempts: u32,
    /// Last failure seen, or why no attempt was made
    pub last_error: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool panicked: {tool_name}")]
    Panicked { tool_name: String },
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge file {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_error_displays_correctly() {
        let err = Error::CompletionFailed(CompletionError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        });
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::ExecutionFailed {
            tool_name: "google_search".into(),
            reason: "connection reset".into(),
        };
        assert!(err.to_string().contains("google_search"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn retry_exhausted_keeps_last_error() {
        let err: Error = RetryExhausted {
            attempts: 3,
            last_error: CompletionError::Network("connection refused".into()).to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "gave up after 3 failed attempts: Network error: connection refused"
        );
    }

    #[test]
    fn rejected_error_keeps_api_message() {
        let err = CompletionError::Rejected("prompt must end with Assistant turn".into());
        assert_eq!(
            err.to_string(),
            "API rejected the request: prompt must end with Assistant turn"
        );
    }
}
