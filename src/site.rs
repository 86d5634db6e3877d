//! Pipeline orchestration.
//!
//! [`build`] runs the stages in strict sequence, each consuming the previous
//! stage's output in memory:
//!
//! ```text
//! 1. Build       board data  →  content tree + folder exports + task registry
//! 2. Render      tree bodies →  template-expanded, Markdown-rendered HTML
//! 3. Materialize tree        →  <dpc_input_dir><path>index.<template_ext>
//! 4. Tasks       registry    →  fetched dependencies, then compiled styles
//! ```
//!
//! Errors in stages 1 to 3 abort the build. Stage 4 never fails as a whole; its
//! per-record problems end up in [`BuildReport::tasks`].

use crate::board::{self, BoardCache, BoardData, BoardError, BoardSource, TrelloClient};
use crate::builder::{self, BuildError, FolderListMap, SkippedField, SkippedPage, TasksFound};
use crate::config::{Config, ConfigError};
use crate::generate::{self, GenerateError, MaterializeOptions};
use crate::render::{self, JinjaEngine, Markdown, RenderError};
use crate::tasks::{self, HandlerRegistry, TaskError, TaskReport};
use crate::tree::SiteTree;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Board error: {0}")]
    Board(#[from] BoardError),
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Generate error: {0}")]
    Generate(#[from] GenerateError),
    #[error("Task setup error: {0}")]
    Task(#[from] TaskError),
}

/// What a full build produced.
#[derive(Debug)]
pub struct BuildReport {
    /// The tree with rendered bodies.
    pub tree: SiteTree,
    pub folders: FolderListMap,
    pub tasks_found: TasksFound,
    pub exported_files: usize,
    pub skipped_fields: Vec<SkippedField>,
    pub skipped_pages: Vec<SkippedPage>,
    pub bodies_rendered: usize,
    pub pages_written: usize,
    pub tasks: TaskReport,
}

/// Fetches from the API and writes the result through to the cache.
struct RefreshingSource {
    client: TrelloClient,
    cache: BoardCache,
}

impl BoardSource for RefreshingSource {
    fn fetch(&self) -> Result<BoardData, BoardError> {
        board::refresh_cache(&self.client, &self.cache)
    }
}

/// The board source selected by `use_cache` and `refresh`.
///
/// With `use_cache` set and no refresh requested the cache is read as is;
/// otherwise the API is queried and the cache updated.
pub fn board_source(config: &Config, refresh: bool) -> Result<Box<dyn BoardSource>, SiteError> {
    let cache = BoardCache::new(config.cache_dir());
    if config.use_cache && !refresh {
        tracing::info!(dir = %cache.dir().display(), "reading board from cache");
        return Ok(Box::new(cache));
    }
    let client = TrelloClient::new(config.credentials()?);
    tracing::info!("fetching board from the API");
    Ok(Box::new(RefreshingSource { client, cache }))
}

/// Run the whole pipeline for `config`.
pub fn build(
    config: &Config,
    source: &dyn BoardSource,
    registry: &HandlerRegistry,
) -> Result<BuildReport, SiteError> {
    let board = source.fetch()?;

    let mut built = builder::build_tree(&board, config)?;

    let bodies_rendered = render::render_bodies(
        &mut built.tree,
        &built.body_refs,
        &JinjaEngine::new(),
        &Markdown,
    )?;

    let pages_written = generate::materialize(
        &built.tree,
        built.tree.root(),
        &config.dpc_input_dir,
        &MaterializeOptions::from_config(config),
    )?;

    let task_report = tasks::run_tasks(&built.tasks_found, registry);

    Ok(BuildReport {
        tree: built.tree,
        folders: built.folders,
        tasks_found: built.tasks_found,
        exported_files: built.exported_files,
        skipped_fields: built.skipped_fields,
        skipped_pages: built.skipped_pages,
        bodies_rendered,
        pages_written,
        tasks: task_report,
    })
}
