//! Documentation generation for one symbol: prompt budget check, chat call
//! with retries, placeholder fallback.

pub mod prompt;

use ai_llm_service::{ChatBackend, ChatError};
use lazy_static::lazy_static;
use prompt::PromptContext;
use std::time::Duration;
use tracing::{error, info, warn};

/// Chat attempts per symbol before giving up.
const MAX_ATTEMPTS: usize = 2;

/// Fixed back-off between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(3);

lazy_static! {
    static ref TOKENIZER: tiktoken_rs::CoreBPE =
        tiktoken_rs::cl100k_base().expect("cl100k_base encoding data is embedded");
}

/// Result of driving the LLM for one symbol.
#[derive(Debug, Clone)]
pub struct GeneratorOutcome {
    /// Response text, or the placeholder body after exhausted retries.
    pub content: String,
    /// False when every attempt failed and `content` is the placeholder.
    pub generated: bool,
}

/// Number of `cl100k_base` tokens in `text`.
pub fn token_count(text: &str) -> usize {
    TOKENIZER.encode_with_special_tokens(text).len()
}

/// Submit the prompts, retrying on transport, model, and other errors
/// alike. Exceeding the token budget only logs a warning, no truncation.
pub async fn generate_doc<L: ChatBackend>(
    llm: &L,
    prompts: &PromptContext,
    max_document_tokens: usize,
) -> GeneratorOutcome {
    let total_tokens = token_count(&prompts.system_prompt) + token_count(&prompts.user_prompt);
    if total_tokens > max_document_tokens {
        warn!(
            item = %prompts.qualified_name,
            total_tokens,
            max_document_tokens,
            "prompt exceeds the token budget"
        );
    } else {
        info!(item = %prompts.qualified_name, total_tokens, "prompt assembled");
    }

    let mut attempt = 0;
    while attempt < MAX_ATTEMPTS {
        match llm.chat(&prompts.system_prompt, &prompts.user_prompt).await {
            Ok(content) => {
                return GeneratorOutcome {
                    content,
                    generated: true,
                };
            }
            Err(err) => {
                match &err {
                    ChatError::Transport(_) => warn!(
                        "request error: {err}. Attempt {} of {MAX_ATTEMPTS}",
                        attempt + 1
                    ),
                    ChatError::HttpStatus { .. } | ChatError::Decode(_) | ChatError::EmptyResponse => {
                        warn!(
                            "response error: {err}. Attempt {} of {MAX_ATTEMPTS}",
                            attempt + 1
                        )
                    }
                    _ => warn!("an error occurred: {err}. Attempt {} of {MAX_ATTEMPTS}", attempt + 1),
                }
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
        }
    }

    error!(item = %prompts.qualified_name, "failed to generate documentation");
    GeneratorOutcome {
        content: format!(
            "{} - [{}]: \ndocumentation to be generated",
            prompts.qualified_name,
            prompts.kind.to_str()
        ),
        generated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::ChatResult;
    use doctree_prep::DocItemKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, _system: &str, _user: &str) -> ChatResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ChatError::EmptyResponse)
            } else {
                Ok("generated body".to_string())
            }
        }
    }

    fn prompts() -> PromptContext {
        PromptContext {
            qualified_name: "a.py/f".to_string(),
            kind: DocItemKind::Function,
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_then_succeeds() {
        let backend = ScriptedBackend {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        };
        let outcome = generate_doc(&backend, &prompts(), 1024).await;
        assert!(outcome.generated);
        assert_eq!(outcome.content, "generated body");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_return_placeholder() {
        let backend = ScriptedBackend {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        };
        let outcome = generate_doc(&backend, &prompts(), 1024).await;
        assert!(!outcome.generated);
        assert_eq!(
            outcome.content,
            "a.py/f - [FunctionDef]: \ndocumentation to be generated"
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn token_count_is_positive_for_text() {
        assert!(token_count("fn main() {}") > 0);
        assert_eq!(token_count(""), 0);
    }
}
