//! Post-processing task pipeline.
//!
//! Stage 4 of the pipeline. Folder lists named after a configured task export
//! files into a task group (see [`crate::builder`]). This module runs those
//! groups in a fixed order:
//!
//! 1. `_dependencies`: each exported file is a JSON manifest
//!    `{ "name": "locator", ... }`. The file stem picks the handler
//!    (`github.json` → `github`). Archives land in `<file dir>/<stem>/<name>/`.
//! 2. `_styles`: each exported file is a stylesheet source. The extension picks
//!    the handler (`site.scss` → `scss`).
//!
//! Styles run only after every dependency has been fetched, so they can import
//! from the extracted archives.
//!
//! ## Skips
//!
//! Anything that prevents one record from running (no handler, unreadable or
//! non-object manifest, missing source) and any handler failure becomes a
//! [`TaskError`]. It is logged, recorded in the [`TaskReport`], and the
//! pipeline moves on. Nothing is rolled back.

pub mod dependencies;
pub mod styles;

pub use dependencies::{ArchiveExtractor, Dependency, DependencyFetcher, DependencyJob, ZipExtractor};
pub use styles::{GrassCompiler, StyleBuilder, StyleCompiler, StyleJob};

use crate::builder::{ExportRecord, TasksFound};
use crate::config::{Config, DEPENDENCIES_TASK, STYLES_TASK};
use crate::dirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("No {group} handler `{name}` for {file}")]
    NoHandler {
        group: &'static str,
        name: String,
        file: PathBuf,
    },
    #[error("Manifest {file} is not valid JSON: {source}")]
    ManifestParse {
        file: PathBuf,
        source: serde_json::Error,
    },
    #[error("Manifest {0} is not a JSON object")]
    ManifestNotObject(PathBuf),
    #[error("Manifest {file} has an unusable entry `{name}`")]
    ManifestEntry { file: PathBuf, name: String },
    #[error("Source file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Download of {locator} failed: {source}")]
    Download {
        locator: String,
        source: reqwest::Error,
    },
    #[error("Extracting {archive} failed: {message}")]
    Extract { archive: PathBuf, message: String },
    #[error("Compiling {file} failed: {message}")]
    Compile { file: PathBuf, message: String },
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> TaskError {
        let path = path.into();
        move |source| TaskError::Io { path, source }
    }
}

/// A unit of post-processing work for one job type.
pub trait TaskHandler<J> {
    /// Registry key: the task name for dependencies, the extension for styles.
    fn name(&self) -> &str;

    fn run(&self, job: &J) -> Result<(), TaskError>;
}

/// Handlers available to the pipeline, keyed by [`TaskHandler::name`].
#[derive(Default)]
pub struct HandlerRegistry {
    dependencies: BTreeMap<String, Box<dyn TaskHandler<DependencyJob>>>,
    styles: BTreeMap<String, Box<dyn TaskHandler<StyleJob>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production handlers: `github` dependencies and `scss` styles.
    pub fn with_defaults(config: &Config) -> Result<Self, TaskError> {
        let mut registry = Self::new();
        registry.register_dependency(DependencyFetcher::new(config, ZipExtractor));
        registry.register_style(StyleBuilder::new(config, GrassCompiler)?);
        Ok(registry)
    }

    pub fn register_dependency(&mut self, handler: impl TaskHandler<DependencyJob> + 'static) {
        self.dependencies
            .insert(handler.name().to_string(), Box::new(handler));
    }

    pub fn register_style(&mut self, handler: impl TaskHandler<StyleJob> + 'static) {
        self.styles.insert(handler.name().to_string(), Box::new(handler));
    }

    pub fn dependency(&self, name: &str) -> Option<&dyn TaskHandler<DependencyJob>> {
        self.dependencies.get(name).map(|h| h.as_ref())
    }

    pub fn style(&self, extension: &str) -> Option<&dyn TaskHandler<StyleJob>> {
        self.styles.get(extension).map(|h| h.as_ref())
    }
}

/// A handler invocation that completed.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRun {
    pub group: &'static str,
    pub handler: String,
    pub file: PathBuf,
}

/// Outcome of [`run_tasks`].
#[derive(Debug, Default)]
pub struct TaskReport {
    pub completed: Vec<TaskRun>,
    pub skipped: Vec<TaskError>,
}

impl TaskReport {
    fn record(&mut self, group: &'static str, file: &Path, outcome: Result<String, TaskError>) {
        match outcome {
            Ok(handler) => {
                tracing::info!(group, handler = %handler, file = %file.display(), "task completed");
                self.completed.push(TaskRun {
                    group,
                    handler,
                    file: file.to_path_buf(),
                });
            }
            Err(err) => {
                tracing::warn!(group, file = %file.display(), error = %err, "task skipped");
                self.skipped.push(err);
            }
        }
    }
}

/// Run `_dependencies` then `_styles` over the export registry.
pub fn run_tasks(found: &TasksFound, registry: &HandlerRegistry) -> TaskReport {
    let mut report = TaskReport::default();

    for record in found.get(DEPENDENCIES_TASK).into_iter().flatten() {
        let outcome = run_dependency(record, registry);
        report.record(DEPENDENCIES_TASK, &record.file_path, outcome);
    }
    for record in found.get(STYLES_TASK).into_iter().flatten() {
        let outcome = run_style(record, registry);
        report.record(STYLES_TASK, &record.file_path, outcome);
    }

    for group in found.keys() {
        if group != DEPENDENCIES_TASK && group != STYLES_TASK {
            tracing::debug!(group = %group, "task group has no pipeline stage");
        }
    }
    report
}

fn run_dependency(record: &ExportRecord, registry: &HandlerRegistry) -> Result<String, TaskError> {
    let file = &record.file_path;
    let handler = registry
        .dependency(&record.task_name)
        .ok_or_else(|| TaskError::NoHandler {
            group: DEPENDENCIES_TASK,
            name: record.task_name.clone(),
            file: file.clone(),
        })?;

    let manifest = read_manifest(file)?;

    let dir = file.parent().unwrap_or(Path::new("."));
    let destination = dir.join(&record.task_name);
    dirs::ensure_dir_like(&destination, dir).map_err(TaskError::io(&destination))?;

    handler.run(&DependencyJob {
        destination,
        manifest,
    })?;
    Ok(handler.name().to_string())
}

/// Parse a dependency manifest: a JSON object of name → locator string.
fn read_manifest(file: &Path) -> Result<Vec<Dependency>, TaskError> {
    let text = fs::read_to_string(file).map_err(TaskError::io(file))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| TaskError::ManifestParse {
            file: file.to_path_buf(),
            source,
        })?;
    let serde_json::Value::Object(entries) = value else {
        return Err(TaskError::ManifestNotObject(file.to_path_buf()));
    };
    entries
        .into_iter()
        .map(|(name, locator)| match locator {
            serde_json::Value::String(locator) if is_plain_name(&name) => {
                Ok(Dependency { name, locator })
            }
            _ => Err(TaskError::ManifestEntry {
                file: file.to_path_buf(),
                name,
            }),
        })
        .collect()
}

/// A single normal path component, so targets stay inside the destination.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

fn run_style(record: &ExportRecord, registry: &HandlerRegistry) -> Result<String, TaskError> {
    let file = &record.file_path;
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let handler = registry.style(extension).ok_or_else(|| TaskError::NoHandler {
        group: STYLES_TASK,
        name: extension.to_string(),
        file: file.clone(),
    })?;
    if !file.is_file() {
        return Err(TaskError::MissingFile(file.clone()));
    }
    handler.run(&StyleJob {
        source: file.clone(),
    })?;
    Ok(handler.name().to_string())
}
