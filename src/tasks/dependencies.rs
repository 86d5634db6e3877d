//! Dependency fetching.
//!
//! A dependency manifest maps a name to an archive locator. For every entry the
//! [`DependencyFetcher`] downloads (or copies) the archive into the temp dir as
//! `<name>.<ext>` and extracts it into `<destination>/<name>/`. With
//! `use_cache` set, entries whose target directory already exists are left
//! alone.
//!
//! Locators:
//!
//! | Form | Fetched with |
//! |------|--------------|
//! | `http://…`, `https://…` | blocking reqwest GET |
//! | `file:///abs/path.zip` | filesystem copy |
//! | anything else | filesystem copy, treated as a path |

use super::{TaskError, TaskHandler};
use crate::config::Config;
use crate::dirs;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub locator: String,
}

/// Work for a dependency handler: fetch every entry into `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyJob {
    pub destination: PathBuf,
    pub manifest: Vec<Dependency>,
}

/// Unpacks a downloaded archive.
pub trait ArchiveExtractor {
    /// Extract `archive` into `target`, returning the number of entries.
    fn extract(&self, archive: &Path, target: &Path) -> Result<usize, TaskError>;
}

/// Zip archives via the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, target: &Path) -> Result<usize, TaskError> {
        let file = File::open(archive).map_err(TaskError::io(archive))?;
        let extract_err = |e: zip::result::ZipError| TaskError::Extract {
            archive: archive.to_path_buf(),
            message: e.to_string(),
        };
        let mut zip = zip::ZipArchive::new(file).map_err(extract_err)?;
        zip.extract(target).map_err(extract_err)?;
        Ok(zip.len())
    }
}

/// The `github` dependency handler.
pub struct DependencyFetcher<X> {
    tmp_dir: PathBuf,
    use_cache: bool,
    extractor: X,
}

impl<X: ArchiveExtractor> DependencyFetcher<X> {
    pub const NAME: &'static str = "github";

    pub fn new(config: &Config, extractor: X) -> Self {
        Self {
            tmp_dir: config.dpc_tmp_dir.clone(),
            use_cache: config.use_cache,
            extractor,
        }
    }

    fn fetch_one(&self, dependency: &Dependency, target: &Path) -> Result<(), TaskError> {
        dirs::ensure_dir(&self.tmp_dir).map_err(TaskError::io(&self.tmp_dir))?;
        let archive = self.tmp_dir.join(format!(
            "{}.{}",
            dependency.name,
            archive_extension(&dependency.locator)
        ));
        fetch(&dependency.locator, &archive)?;
        let entries = self.extractor.extract(&archive, target)?;
        tracing::info!(
            dependency = %dependency.name,
            target = %target.display(),
            entries,
            "dependency extracted"
        );
        Ok(())
    }
}

impl<X: ArchiveExtractor> TaskHandler<DependencyJob> for DependencyFetcher<X> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, job: &DependencyJob) -> Result<(), TaskError> {
        for dependency in &job.manifest {
            let target = job.destination.join(&dependency.name);
            if self.use_cache && target.exists() {
                tracing::debug!(dependency = %dependency.name, "dependency already present");
                continue;
            }
            self.fetch_one(dependency, &target)?;
        }
        Ok(())
    }
}

/// File extension of the locator's last path segment, `zip` when it has none.
pub fn archive_extension(locator: &str) -> &str {
    let path = locator.split(['?', '#']).next().unwrap_or(locator);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => "zip",
    }
}

/// Copy the resource at `locator` to `dest`.
fn fetch(locator: &str, dest: &Path) -> Result<(), TaskError> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let download_err = |source| TaskError::Download {
            locator: locator.to_string(),
            source,
        };
        let bytes = reqwest::blocking::get(locator)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(download_err)?;
        let mut file = File::create(dest).map_err(TaskError::io(dest))?;
        file.write_all(&bytes).map_err(TaskError::io(dest))?;
        return Ok(());
    }

    let source = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
    fs::copy(source, dest).map_err(TaskError::io(source))?;
    Ok(())
}
