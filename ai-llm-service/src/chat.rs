//! Chat client for the local Ollama API.
//!
//! This module implements a thin client for
//! `POST {endpoint}/api/chat`: synchronous chat completion (`stream=false`)
//! with a system and a user message. The documentation generator drives it
//! through the [`ChatBackend`] seam so tests can substitute a scripted
//! backend without touching HTTP.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{ChatError, ChatResult, validate_http_endpoint};

/// Configuration for one chat model endpoint.
#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    /// Base endpoint, e.g. `http://localhost:11434`.
    pub host: String,
    /// Model name, e.g. `qwen3:14b`.
    pub model: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Backend seam for chat completion: one system + one user message in,
/// the assistant's text out.
pub trait ChatBackend: Send + Sync {
    fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> impl Future<Output = ChatResult<String>> + Send;
}

/// Thin chat client for Ollama.
///
/// Reuses one HTTP client with the configured timeout; every call is a
/// non-streaming `POST /api/chat`.
pub struct OllamaChatService {
    client: reqwest::Client,
    cfg: ChatModelConfig,
    url_chat: String,
}

impl OllamaChatService {
    /// Creates a new [`OllamaChatService`] from the given config.
    ///
    /// # Errors
    /// - [`ChatError::InvalidEndpoint`] if `cfg.host` is invalid
    /// - [`ChatError::EmptyModel`] if `cfg.model` is empty
    /// - [`ChatError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: ChatModelConfig) -> ChatResult<Self> {
        validate_http_endpoint(&cfg.host)?;
        if cfg.model.trim().is_empty() {
            return Err(ChatError::EmptyModel);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        let base = cfg.host.trim().trim_end_matches('/').to_string();
        let url_chat = format!("{}/api/chat", base);

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a **non-streaming** chat request via `/api/chat`.
    ///
    /// # Errors
    /// - [`ChatError::HttpStatus`] for non-2xx responses
    /// - [`ChatError::Transport`] for client errors
    /// - [`ChatError::Decode`] if the response cannot be parsed
    /// - [`ChatError::EmptyResponse`] if the message content is empty
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    async fn chat_request(&self, system_prompt: &str, user_prompt: &str) -> ChatResult<String> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            stream: false,
        };

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(ChatError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: ChatResponse = resp.json().await.map_err(|e| {
            ChatError::Decode(format!("serde error: {e}; ensure `stream=false` is used"))
        })?;

        if out.message.content.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(out.message.content)
    }
}

impl ChatBackend for OllamaChatService {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> ChatResult<String> {
        self.chat_request(system_prompt, user_prompt).await
    }
}

/* ==========================
HTTP payloads
========================== */

/// Request body for `/api/chat` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

/// One chat turn.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body for `/api/chat`.
///
/// Minimal shape: the generated text is in `message.content`.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_endpoint() {
        let cfg = ChatModelConfig {
            host: "localhost:11434".into(),
            model: "qwen3:14b".into(),
            request_timeout_secs: 30,
        };
        assert!(matches!(
            OllamaChatService::new(cfg),
            Err(ChatError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn rejects_empty_model() {
        let cfg = ChatModelConfig {
            host: "http://localhost:11434".into(),
            model: "  ".into(),
            request_timeout_secs: 30,
        };
        assert!(matches!(
            OllamaChatService::new(cfg),
            Err(ChatError::EmptyModel)
        ));
    }

    #[test]
    fn accepts_trailing_slash_endpoint() {
        let cfg = ChatModelConfig {
            host: "http://localhost:11434/".into(),
            model: "qwen3:14b".into(),
            request_timeout_secs: 30,
        };
        let svc = OllamaChatService::new(cfg).unwrap();
        assert_eq!(svc.url_chat, "http://localhost:11434/api/chat");
    }
}
