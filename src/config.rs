//! Build configuration.
//!
//! A single `board-site.toml` drives the whole pipeline. Every recognized key
//! is a field on [`Config`]; unknown keys are rejected at load time, and keys
//! that a run cannot do without are checked by [`Config::validate`] before any
//! work starts.
//!
//! ## Configuration Options
//!
//! ```toml
//! dpc_root = "site"              # Root for folder lists and the board cache
//! dpc_input_dir = "site/pages"   # Where page templates are written
//! dpc_output_dir = "site/public" # Final output (compiled CSS lands in css/)
//! dpc_tmp_dir = "site/tmp"       # Scratch space for downloaded archives
//!
//! use_cache = false              # Read the board from _trello_cache/
//! trello_api_key = "..."         # Required when use_cache = false
//! trello_token = "..."
//! trello_board_id = "..."
//!
//! home_page_title = "Home"
//! head_stylesheets = ["/css/site.css"]
//! head_style = "body { margin: 0 }"
//!
//! template_ext = "html.jinja"
//! base_template = "structure.html"
//!
//! [tasks]
//! _dependencies = "github"       # Sub-directory added to the style import path
//! _styles = true
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the board cache directory inside `dpc_root`.
pub const CACHE_DIR_NAME: &str = "_trello_cache";

/// Task group fetched before anything else runs.
pub const DEPENDENCIES_TASK: &str = "_dependencies";

/// Task group compiled once dependencies are in place.
pub const STYLES_TASK: &str = "_styles";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Required config key `{0}` is missing or empty")]
    Missing(&'static str),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Value of an entry under `[tasks]`.
///
/// `true` switches a task on, a string names a handler-specific sub-directory
/// (`_dependencies = "github"`), and a table carries free-form handler options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskSetting {
    Enabled(bool),
    Named(String),
    Options(toml::Table),
}

/// Pipeline configuration loaded from `board-site.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root for folder lists, the board cache and dependency sub-directories.
    pub dpc_root: PathBuf,
    /// Base directory for materialized page templates.
    pub dpc_input_dir: PathBuf,
    /// Final output directory. Compiled styles go to `css/` below it.
    pub dpc_output_dir: PathBuf,
    /// Scratch directory for downloaded archives.
    pub dpc_tmp_dir: PathBuf,
    /// Read board data from the on-disk cache instead of the API, and keep
    /// already-extracted dependencies.
    pub use_cache: bool,
    pub trello_api_key: Option<String>,
    pub trello_token: Option<String>,
    pub trello_board_id: Option<String>,
    /// Title of the root page. The board name becomes the site title.
    pub home_page_title: String,
    /// Stylesheet URLs linked from every page head.
    pub head_stylesheets: Vec<String>,
    /// Inline CSS placed in every page head.
    pub head_style: Option<String>,
    /// Extension of the materialized page templates (without leading dot).
    pub template_ext: String,
    /// Template every materialized page extends.
    pub base_template: String,
    /// Task name → setting. See [`TaskSetting`].
    pub tasks: BTreeMap<String, TaskSetting>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dpc_root: PathBuf::new(),
            dpc_input_dir: PathBuf::new(),
            dpc_output_dir: PathBuf::new(),
            dpc_tmp_dir: PathBuf::new(),
            use_cache: false,
            trello_api_key: None,
            trello_token: None,
            trello_board_id: None,
            home_page_title: "Home".to_string(),
            head_stylesheets: Vec::new(),
            head_style: None,
            template_ext: "html.jinja".to_string(),
            base_template: "structure.html".to_string(),
            tasks: BTreeMap::new(),
        }
    }
}

/// API credentials, only needed when the board is fetched rather than read
/// from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct TrelloCredentials {
    pub api_key: String,
    pub token: String,
    pub board_id: String,
}

impl Config {
    /// Check required keys and value constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("dpc_root", &self.dpc_root),
            ("dpc_input_dir", &self.dpc_input_dir),
            ("dpc_output_dir", &self.dpc_output_dir),
            ("dpc_tmp_dir", &self.dpc_tmp_dir),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }
        if !self.use_cache {
            self.credentials()?;
        }
        if self.template_ext.is_empty() || self.template_ext.starts_with('.') {
            return Err(ConfigError::Validation(
                "template_ext must be non-empty and have no leading dot".into(),
            ));
        }
        if self.base_template.is_empty() {
            return Err(ConfigError::Missing("base_template"));
        }
        Ok(())
    }

    /// API credentials, or the first missing key.
    pub fn credentials(&self) -> Result<TrelloCredentials, ConfigError> {
        fn required(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(ConfigError::Missing(key)),
            }
        }
        Ok(TrelloCredentials {
            api_key: required(&self.trello_api_key, "trello_api_key")?,
            token: required(&self.trello_token, "trello_token")?,
            board_id: required(&self.trello_board_id, "trello_board_id")?,
        })
    }

    /// Whether `name` is a configured (and not switched off) task.
    pub fn has_task(&self, name: &str) -> bool {
        match self.tasks.get(name) {
            Some(TaskSetting::Enabled(enabled)) => *enabled,
            Some(_) => true,
            None => false,
        }
    }

    /// Sub-directory of `_dependencies` that style compilation imports from.
    pub fn dependency_subdir(&self) -> Option<&str> {
        match self.tasks.get(DEPENDENCIES_TASK)? {
            TaskSetting::Named(dir) if !dir.is_empty() => Some(dir),
            TaskSetting::Options(table) => table.get("dir").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// Directory holding the four cached board documents.
    pub fn cache_dir(&self) -> PathBuf {
        self.dpc_root.join(CACHE_DIR_NAME)
    }

    /// Directory compiled styles are written to.
    pub fn css_dir(&self) -> PathBuf {
        self.dpc_output_dir.join("css")
    }

    /// Make the four directory keys absolute relative to `base`.
    fn resolve_relative(&mut self, base: &Path) {
        for dir in [
            &mut self.dpc_root,
            &mut self.dpc_input_dir,
            &mut self.dpc_output_dir,
            &mut self.dpc_tmp_dir,
        ] {
            if dir.is_relative() && !dir.as_os_str().is_empty() {
                *dir = base.join(&*dir);
            }
        }
    }
}

/// Parse and validate config text. Paths are left as written.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load, resolve and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    if let Some(base) = path.parent() {
        config.resolve_relative(base);
    }
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `board-site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# board-site configuration
# ========================
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Directories (required)
# ---------------------------------------------------------------------------
# Folder lists ("/name") are exported here, next to the board cache.
dpc_root = "site"
# Page templates are written here, one index file per page.
dpc_input_dir = "site/pages"
# Final output. Compiled styles land in css/ below it.
dpc_output_dir = "site/public"
# Scratch space for downloaded dependency archives.
dpc_tmp_dir = "site/tmp"

# ---------------------------------------------------------------------------
# Board source
# ---------------------------------------------------------------------------
# Read the board from site/_trello_cache/ instead of the API. Cached data is
# never discarded automatically; run `board-site fetch` to refresh it.
use_cache = true

# Required when use_cache = false.
# trello_api_key = ""
# trello_token = ""
# trello_board_id = ""

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
home_page_title = "Home"
head_stylesheets = []
# head_style = ""

# Extension and parent template of the materialized pages.
template_ext = "html.jinja"
base_template = "structure.html"

# ---------------------------------------------------------------------------
# Tasks
# ---------------------------------------------------------------------------
# Folder lists named after a task feed it. _dependencies runs before _styles.
[tasks]
# _dependencies = "github"
# _styles = true
"##
}
