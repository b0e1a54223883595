//! Error types for `ai-llm-service`.
//!
//! All error messages include the suffix `[AI LLM Service]` so that logs
//! and bubbled-up errors can be easily attributed to this library.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias for chat operations.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Errors produced by the chat service.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid endpoint (empty or missing http/https).
    #[error("[AI LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Model name was empty.
    #[error("[AI LLM Service] model name must not be empty")]
    EmptyModel,

    /// Transport/HTTP client error (connect, DNS, timeout).
    #[error("[AI LLM Service] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("[AI LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// Unexpected/invalid JSON response.
    #[error("[AI LLM Service] failed to decode response: {0}")]
    Decode(String),

    /// The model answered with an empty message.
    #[error("[AI LLM Service] empty response message")]
    EmptyResponse,
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(value: &str) -> ChatResult<()> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(ChatError::InvalidEndpoint(value.to_string()))
    }
}
