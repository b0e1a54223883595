//! CLI entry for the documentation pipeline.

mod collaborators;

use ai_llm_service::{ChatModelConfig, OllamaChatService};
use anyhow::{Context, bail};
use clap::Parser;
use doc_orchestrator::{Runner, RunnerConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "doc-ai-backend",
    about = "Automatic per-symbol documentation maintenance for a source repository"
)]
struct Args {
    /// Wipe the snapshot and docs folders and regenerate from scratch.
    #[arg(short, long)]
    clear: bool,

    /// Prompt template profile to use.
    #[arg(short, long, default_value = "dev")]
    profile: String,

    /// Override repo_path from config.yml.
    #[arg(long = "repo_path")]
    repo_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = RunnerConfig::load(Path::new("config.yml")).context("loading config.yml")?;
    if let Some(repo_path) = args.repo_path {
        cfg.repo_path = repo_path;
    }

    let Some(parser_command) = cfg.parser_command.clone() else {
        bail!("parser_command must be configured in config.yml");
    };
    let Some(resolver_command) = cfg.resolver_command.clone() else {
        bail!("resolver_command must be configured in config.yml");
    };
    let parser = collaborators::CommandParser::new(parser_command);
    let resolver = collaborators::CommandResolver::new(resolver_command);

    let llm = OllamaChatService::new(ChatModelConfig {
        host: cfg.ollama_host.clone(),
        model: cfg.ollama_model.clone(),
        request_timeout_secs: cfg.default_completion_kwargs.request_timeout,
    })?;

    let runner = Runner::new(cfg, &args.profile, parser, resolver, llm)?;
    runner.run(args.clear).await?;

    tracing::info!("documentation task completed");
    Ok(())
}
