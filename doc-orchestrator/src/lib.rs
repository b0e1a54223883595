//! Public entry for the documentation pipeline.
//!
//! A run walks four stages:
//!
//! 1) **Snapshot build/load**: materialize phantom files, scan and parse
//!    the working tree (or rehydrate the previous checkpoint).
//! 2) **Change detection**: transfer surviving docs from the previous
//!    snapshot, resolve references, and react to referencer-set changes.
//! 3) **Planning**: derive the dependency-ordered task set.
//! 4) **Execution**: bounded workers drive the LLM per symbol, with
//!    periodic checkpoints and Markdown republication; on completion the
//!    snapshot is flashed with reference edges, Markdown is rendered, the
//!    working tree is restored, and outputs are staged.
//!
//! The pipeline uses `tracing` for debug logging and avoids `async-trait`
//! and heap trait objects: the parser and resolver are generic parameters
//! used only during the single-threaded analysis phase, and the LLM is a
//! [`ChatBackend`] shared by the workers.

pub mod config;
pub mod errors;
pub mod executor;
pub mod generator;
pub mod markdown;
pub mod planner;
pub mod refs;

use ai_llm_service::ChatBackend;
use config::DocConfig;
use doctree_prep::{
    DocItemStatus, ItemId, MetaInfo, ReferenceResolver, SourceParser, SymbolRecord, meta, snapshot,
    transfer,
};
use errors::{ConfigError, DocResult, Error};
use executor::TaskManager;
use generator::prompt::{self, PromptProfile};
use git_phantom_engine::RepoInspector;
use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

pub use config::{CompletionKwargs, DocConfig as RunnerConfig};
pub use errors::{DocResult as RunnerResult, Error as RunnerError};

/// Orchestrates one documentation run over a repository.
pub struct Runner<P, R, L> {
    cfg: DocConfig,
    profile: &'static PromptProfile,
    parser: P,
    resolver: R,
    llm: L,
}

impl<P, R, L> Runner<P, R, L>
where
    P: SourceParser,
    R: ReferenceResolver,
    L: ChatBackend + 'static,
{
    /// Wire a runner; fails on an unknown prompt profile.
    pub fn new(
        cfg: DocConfig,
        profile_name: &str,
        parser: P,
        resolver: R,
        llm: L,
    ) -> DocResult<Self> {
        let profile = prompt::select_profile(profile_name)
            .ok_or_else(|| ConfigError::UnknownProfile(profile_name.to_string()))?;
        Ok(Self {
            cfg,
            profile,
            parser,
            resolver,
            llm,
        })
    }

    /// Run the pipeline. The working tree is restored on every exit path;
    /// with `clear` the snapshot and docs folders are wiped first.
    #[instrument(skip_all, fields(repo = %self.cfg.repo_path.display()))]
    pub async fn run(self, clear: bool) -> DocResult<()> {
        let repo_path = self.cfg.repo_path.clone();
        let ext = self.cfg.source_extension.clone();

        if clear {
            for dir in [self.cfg.hierarchy_dir(), self.cfg.markdown_dir()] {
                if dir.exists() {
                    fs::remove_dir_all(&dir)?;
                    info!(dir = %dir.display(), "cleared output directory");
                }
            }
        }

        let result = self.execute_pipeline().await;
        if let Err(err) = git_phantom_engine::restore(&repo_path, &ext) {
            warn!(error = %err, "failed to restore working tree; manual restore required");
        }
        result
    }

    async fn execute_pipeline(self) -> DocResult<()> {
        let cfg = self.cfg.clone();
        let hierarchy_dir = cfg.hierarchy_dir();

        debug!("stage 1: snapshot build/load");
        let mut meta = if !hierarchy_dir.join(snapshot::HIERARCHY_FILE).exists() {
            let (reflections, jump_files) =
                git_phantom_engine::materialize(&cfg.repo_path, &cfg.source_extension)?;
            let files = self.scan_and_parse(&reflections, &jump_files)?;
            let meta =
                meta::MetaInfo::init(cfg.repo_path.clone(), &files, reflections, jump_files)?;
            snapshot::checkpoint(&meta, &hierarchy_dir, false)?;
            meta
        } else {
            snapshot::load(&hierarchy_dir)?
        };

        meta.whitelist = cfg.load_whitelist()?;
        snapshot::checkpoint(&meta, &hierarchy_dir, false)?;

        debug!("stage 2: change detection");
        if meta.document_version.is_empty() {
            info!("no previous version, starting first generation");
            refs::resolve_references(&mut meta, &self.resolver);
        } else if !meta.in_generation_process {
            info!("starting change detection against the previous version");
            let (reflections, jump_files) =
                git_phantom_engine::materialize(&cfg.repo_path, &cfg.source_extension)?;
            let files = self.scan_and_parse(&reflections, &jump_files)?;
            let mut new_meta =
                meta::MetaInfo::init(cfg.repo_path.clone(), &files, reflections, jump_files)?;
            new_meta.whitelist = meta.whitelist.clone();
            transfer::transfer_docs_from_older(&mut new_meta, &meta);
            refs::resolve_references(&mut new_meta, &self.resolver);
            transfer::detect_referencer_changes(&mut new_meta, &meta);
            meta = new_meta;
        } else {
            info!("resuming an interrupted generation run");
        }

        debug!("stage 3: planning");
        let manager = planner::plan_tasks(&mut meta, &cfg.ignore_list);
        log_task_list(&manager, &meta);
        if manager.all_success() {
            info!("no tasks in the queue, all documents are up to date");
        }

        meta.in_generation_process = true;
        snapshot::checkpoint(&meta, &hierarchy_dir, true)?;

        debug!(workers = cfg.max_thread_count, "stage 4: execution");
        let manager = Arc::new(manager);
        let ctx = Arc::new(GenerationContext {
            cfg: cfg.clone(),
            profile: self.profile,
            meta: RwLock::new(meta),
            snapshot_lock: Mutex::new(()),
            llm: self.llm,
        });

        let mut handles = Vec::with_capacity(cfg.max_thread_count);
        for worker_id in 0..cfg.max_thread_count {
            let handler_ctx = ctx.clone();
            let sync_ctx = ctx.clone();
            handles.push(tokio::spawn(executor::worker(
                manager.clone(),
                worker_id,
                move |item| {
                    let ctx = handler_ctx.clone();
                    async move { generate_for_item(ctx, item).await }
                },
                move || {
                    let ctx = sync_ctx.clone();
                    async move { ctx.publish_markdown() }
                },
            )));
        }
        let mut worker_failure = None;
        for handle in handles {
            if let Err(err) = handle.await {
                worker_failure = Some(Error::Worker(err.to_string()));
            }
        }
        if let Some(err) = worker_failure {
            return Err(err);
        }

        let ctx = Arc::try_unwrap(ctx)
            .map_err(|_| Error::Worker("generation context still shared after join".into()))?;
        let mut meta = ctx
            .meta
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        debug!("finalizing run");
        let inspector = RepoInspector::open(&cfg.repo_path)?;
        meta.document_version = inspector.head_commit_hash()?;
        meta.in_generation_process = false;
        snapshot::checkpoint(&meta, &hierarchy_dir, true)?;
        markdown::refresh(
            &meta,
            &cfg.repo_path,
            &cfg.markdown_docs_folder,
            &cfg.source_extension,
        )?;
        git_phantom_engine::restore(&cfg.repo_path, &cfg.source_extension)?;

        let markdown_prefix = format!("{}/", cfg.markdown_docs_folder.trim_end_matches('/'));
        let hierarchy_prefix = format!("{}/", cfg.project_hierarchy.trim_end_matches('/'));
        let staged =
            inspector.stage_outputs(&[markdown_prefix.as_str(), hierarchy_prefix.as_str()])?;
        if !staged.is_empty() {
            info!(files = ?staged, "added generated outputs to the staging area");
        }
        info!(version = %meta.document_version, "documentation forwarded to the latest version");
        Ok(())
    }

    /// Walk the repository for source files and run the parser on each.
    ///
    /// Jump files and the output folders are skipped. For a phantom-swapped
    /// file the parked `_latest_version` copy holds the working-tree code:
    /// it is the one parsed, keyed under the original path, while the
    /// committed stand-in at the original path is only there for the
    /// reference resolver. A zero-byte parked file marks a deletion and
    /// contributes nothing.
    fn scan_and_parse(
        &self,
        reflections: &BTreeMap<String, String>,
        jump_files: &[String],
    ) -> DocResult<BTreeMap<String, Vec<SymbolRecord>>> {
        let cfg = &self.cfg;
        let dot_ext = format!(".{}", cfg.source_extension);
        let parked_suffix = git_phantom_engine::latest_version_suffix(&cfg.source_extension);

        let mut files = BTreeMap::new();
        let walker = WalkDir::new(&cfg.repo_path)
            .into_iter()
            .filter_entry(|e| keep_entry(e, &cfg.project_hierarchy, &cfg.markdown_docs_folder));
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&cfg.repo_path) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.ends_with(&dot_ext) {
                continue;
            }
            if jump_files.contains(&rel) {
                debug!(file = %rel, "skipping jump file");
                continue;
            }

            let is_parked = rel.ends_with(&parked_suffix);
            let key = if is_parked {
                format!("{}{}", &rel[..rel.len() - parked_suffix.len()], dot_ext)
            } else if reflections.contains_key(&rel) {
                // Committed stand-in; the parked copy carries the code to
                // document.
                continue;
            } else {
                rel.clone()
            };

            let source = match fs::read_to_string(entry.path()) {
                Ok(source) => source,
                Err(err) => {
                    warn!(file = %rel, error = %err, "cannot read source file, skipping");
                    continue;
                }
            };
            if is_parked && source.is_empty() {
                debug!(file = %key, "deleted file, excluded from the tree");
                continue;
            }
            let records = self.parser.functions_and_classes(&source);
            files.insert(key, records);
        }
        info!(files = files.len(), "scanned and parsed source files");
        Ok(files)
    }
}

/// Directory filter for the repository walk.
fn keep_entry(entry: &DirEntry, hierarchy: &str, markdown: &str) -> bool {
    if entry.file_type().is_dir() {
        if let Some(name) = entry.file_name().to_str() {
            return name != ".git" && name != hierarchy && name != markdown;
        }
    }
    true
}

fn log_task_list(manager: &TaskManager, meta: &MetaInfo) {
    for (task_id, item, deps) in manager.overview() {
        info!(
            task = task_id,
            dependencies = deps.len(),
            status = ?meta.tree.get(item).status,
            item = %meta.tree.full_name(item),
            "task queued"
        );
    }
}

/// Shared state of the execution phase. Workers mutate only the item their
/// running task owns; the snapshot lock serializes checkpoints and
/// Markdown republication.
struct GenerationContext<L> {
    cfg: DocConfig,
    profile: &'static PromptProfile,
    meta: RwLock<MetaInfo>,
    snapshot_lock: Mutex<()>,
    llm: L,
}

impl<L: ChatBackend> GenerationContext<L> {
    fn read_meta(&self) -> RwLockReadGuard<'_, MetaInfo> {
        self.meta.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_meta(&self) -> RwLockWriteGuard<'_, MetaInfo> {
        self.meta.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Flash a checkpoint under the snapshot lock; failures are logged,
    /// not fatal; the next checkpoint retries.
    fn checkpoint(&self) {
        let _guard = self
            .snapshot_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let meta = self.read_meta();
        if let Err(err) = snapshot::checkpoint(&meta, &self.cfg.hierarchy_dir(), true) {
            warn!(error = %err, "mid-run checkpoint failed");
        }
    }

    /// Republish intermediate Markdown (the executor's sync callback).
    fn publish_markdown(&self) {
        let _guard = self
            .snapshot_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let meta = self.read_meta();
        if let Err(err) = markdown::refresh(
            &meta,
            &self.cfg.repo_path,
            &self.cfg.markdown_docs_folder,
            &self.cfg.source_extension,
        ) {
            warn!(error = %err, "intermediate markdown refresh failed");
        }
    }
}

/// Worker handler: build prompts under a read lock, call the LLM without
/// holding any lock, then append the result and checkpoint.
async fn generate_for_item<L: ChatBackend>(ctx: Arc<GenerationContext<L>>, item: ItemId) {
    let prompts = {
        let meta = ctx.read_meta();
        if !meta.tree.needs_doc(item, &ctx.cfg.ignore_list) {
            info!(item = %meta.tree.full_name(item), "ignored or already generated, skipping");
            return;
        }
        info!(
            kind = %meta.tree.get(item).kind,
            item = %meta.tree.full_name(item),
            "generating document"
        );
        generator::prompt::build_prompts(&meta, item, ctx.profile)
    };

    let outcome = generator::generate_doc(&ctx.llm, &prompts, ctx.cfg.max_document_tokens).await;

    {
        let mut meta = ctx.write_meta();
        let node = meta.tree.get_mut(item);
        node.md_content.push(outcome.content);
        node.status = if outcome.generated {
            DocItemStatus::UpToDate
        } else {
            DocItemStatus::NotGenerated
        };
    }
    if outcome.generated {
        info!(item = %prompts.qualified_name, "document appended");
    }
    ctx.checkpoint();
}
