//! Shared LLM chat service for the documentation pipeline.
//!
//! Provides the [`chat::ChatBackend`] seam, its Ollama implementation
//! ([`chat::OllamaChatService`]), and the unified error type.

pub mod chat;
pub mod errors;

pub use chat::{ChatBackend, ChatModelConfig, OllamaChatService};
pub use errors::{ChatError, ChatResult};
