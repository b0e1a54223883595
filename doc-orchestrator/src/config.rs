//! Configuration for a documentation run, loaded from `config.yml`.
//!
//! Configuration is an explicit value threaded through constructors; there
//! are no process-wide singletons. Unknown keys are ignored, missing
//! optional keys fall back to defaults, and `validate` rejects values the
//! pipeline cannot work with.

use crate::errors::{ConfigError, DocResult};
use doctree_prep::WhitelistEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocConfig {
    /// Repository to document.
    pub repo_path: PathBuf,
    /// Snapshot subdirectory, relative to `repo_path`.
    #[serde(default = "default_project_hierarchy")]
    pub project_hierarchy: String,
    /// Rendered-Markdown subdirectory, relative to `repo_path`.
    #[serde(default = "default_markdown_docs_folder")]
    pub markdown_docs_folder: String,
    /// Optional JSON whitelist restricting generation targets.
    #[serde(default)]
    pub whitelist_path: Option<PathBuf>,
    /// Worker count for the concurrent executor.
    #[serde(default = "default_max_thread_count")]
    pub max_thread_count: usize,
    /// Soft prompt budget in `cl100k_base` tokens.
    #[serde(default = "default_max_document_tokens")]
    pub max_document_tokens: usize,
    /// Qualified-name prefixes excluded from generation.
    #[serde(default)]
    pub ignore_list: Vec<String>,
    /// Ollama endpoint, e.g. `http://localhost:11434`.
    pub ollama_host: String,
    /// Ollama model name.
    pub ollama_model: String,
    /// Extension of the source language the external parser understands.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// External parser command (reads source on stdin, prints symbol
    /// records as JSON). Only the binary's command adapters read this.
    #[serde(default)]
    pub parser_command: Option<String>,
    /// External reference-resolver command (gets symbol coordinates as
    /// arguments, prints hits as JSON).
    #[serde(default)]
    pub resolver_command: Option<String>,
    #[serde(default)]
    pub default_completion_kwargs: CompletionKwargs,
}

/// Pass-through knobs for the LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionKwargs {
    /// HTTP timeout for one chat request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for CompletionKwargs {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_project_hierarchy() -> String {
    ".project_doc_record".to_string()
}

fn default_markdown_docs_folder() -> String {
    "markdown_docs".to_string()
}

fn default_max_thread_count() -> usize {
    4
}

fn default_max_document_tokens() -> usize {
    1024
}

fn default_source_extension() -> String {
    "py".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl DocConfig {
    /// Load and validate `config.yml` from `path`.
    pub fn load(path: &Path) -> DocResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: DocConfig = serde_yml::from_str(&raw).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Basic validation: the run aborts before touching the working tree
    /// when any of these fail.
    pub fn validate(&self) -> DocResult<()> {
        if self.repo_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("repo_path must not be empty".into()).into());
        }
        if self.max_thread_count == 0 {
            return Err(ConfigError::Invalid("max_thread_count must be greater than 0".into()).into());
        }
        if self.max_document_tokens == 0 {
            return Err(
                ConfigError::Invalid("max_document_tokens must be greater than 0".into()).into(),
            );
        }
        if self.source_extension.is_empty() || self.source_extension.starts_with('.') {
            return Err(ConfigError::Invalid(
                "source_extension must be a bare extension like `py`".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Load the whitelist when configured; a configured-but-missing file is
    /// a fatal configuration error.
    pub fn load_whitelist(&self) -> DocResult<Option<Vec<WhitelistEntry>>> {
        let Some(path) = &self.whitelist_path else {
            return Ok(None);
        };
        if !path.exists() {
            return Err(ConfigError::MissingWhitelist(path.clone()).into());
        }
        let raw = fs::read(path)?;
        let entries: Vec<WhitelistEntry> =
            serde_json::from_slice(&raw).map_err(ConfigError::WhitelistFormat)?;
        Ok(Some(entries))
    }

    /// Snapshot directory under the repository.
    pub fn hierarchy_dir(&self) -> PathBuf {
        self.repo_path.join(&self.project_hierarchy)
    }

    /// Rendered-docs directory under the repository.
    pub fn markdown_dir(&self) -> PathBuf {
        self.repo_path.join(&self.markdown_docs_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "repo_path: /tmp/repo\nollama_host: http://localhost:11434\nollama_model: qwen3:14b"
        )
        .unwrap();
        let cfg = DocConfig::load(file.path()).unwrap();
        assert_eq!(cfg.project_hierarchy, ".project_doc_record");
        assert_eq!(cfg.max_document_tokens, 1024);
        assert_eq!(cfg.source_extension, "py");
        assert_eq!(cfg.default_completion_kwargs.request_timeout, 30);
    }

    #[test]
    fn rejects_zero_thread_count() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "repo_path: /tmp/repo\nollama_host: h\nollama_model: m\nmax_thread_count: 0"
        )
        .unwrap();
        assert!(DocConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_config_file_is_fatal() {
        assert!(DocConfig::load(Path::new("/nonexistent/config.yml")).is_err());
    }

    #[test]
    fn configured_but_missing_whitelist_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "repo_path: /tmp/repo\nollama_host: h\nollama_model: m\nwhitelist_path: /nonexistent/wl.json"
        )
        .unwrap();
        let cfg = DocConfig::load(file.path()).unwrap();
        assert!(cfg.load_whitelist().is_err());
    }
}
