//! Stylesheet compilation.
//!
//! The [`StyleBuilder`] compiles an exported SCSS file to
//! `<dpc_output_dir>/css/<stem>.css`. Imports resolve against the source's own
//! directory and, when `tasks._dependencies` names a sub-directory, against
//! `<dpc_root>/_dependencies/<subdir>` so stylesheets can pull in fetched
//! archives.

use super::{TaskError, TaskHandler};
use crate::config::{Config, DEPENDENCIES_TASK};
use crate::dirs;
use grass::{Options, OutputStyle};
use std::fs;
use std::path::{Path, PathBuf};

/// Work for a style handler.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleJob {
    pub source: PathBuf,
}

/// Turns a stylesheet source into CSS.
pub trait StyleCompiler {
    fn compile(&self, source: &Path, load_paths: &[PathBuf]) -> Result<String, String>;
}

/// SCSS via grass, expanded output.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

impl StyleCompiler for GrassCompiler {
    fn compile(&self, source: &Path, load_paths: &[PathBuf]) -> Result<String, String> {
        let options = Options::default()
            .load_paths(load_paths)
            .style(OutputStyle::Expanded);
        grass::from_path(source, &options).map_err(|e| e.to_string())
    }
}

/// The `scss` style handler.
pub struct StyleBuilder<C> {
    compiler: C,
    css_dir: PathBuf,
    dependency_dir: Option<PathBuf>,
}

impl<C: StyleCompiler> StyleBuilder<C> {
    pub const EXTENSION: &'static str = "scss";

    /// Creates the css output directory if it is missing.
    pub fn new(config: &Config, compiler: C) -> Result<Self, TaskError> {
        let css_dir = config.css_dir();
        dirs::ensure_dir_like(&css_dir, &config.dpc_output_dir).map_err(TaskError::io(&css_dir))?;
        let dependency_dir = config
            .dependency_subdir()
            .map(|sub| config.dpc_root.join(DEPENDENCIES_TASK).join(sub));
        Ok(Self {
            compiler,
            css_dir,
            dependency_dir,
        })
    }

    /// Directories searched for `@import` / `@use`.
    pub fn load_paths(&self, source: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(dir) = source.parent() {
            paths.push(dir.to_path_buf());
        }
        paths.extend(self.dependency_dir.clone());
        paths
    }

    /// Where the compiled CSS for `source` is written.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or(source.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".css");
        self.css_dir.join(name)
    }
}

impl<C: StyleCompiler> TaskHandler<StyleJob> for StyleBuilder<C> {
    fn name(&self) -> &str {
        Self::EXTENSION
    }

    fn run(&self, job: &StyleJob) -> Result<(), TaskError> {
        let css = self
            .compiler
            .compile(&job.source, &self.load_paths(&job.source))
            .map_err(|message| TaskError::Compile {
                file: job.source.clone(),
                message,
            })?;
        let output = self.output_path(&job.source);
        fs::write(&output, css).map_err(TaskError::io(&output))?;
        tracing::info!(source = %job.source.display(), output = %output.display(), "stylesheet compiled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    fn config(root: &Path, extra: &str) -> Config {
        parse_config(&format!(
            r#"
            dpc_root = "{root}"
            dpc_input_dir = "{root}/input"
            dpc_output_dir = "{root}/output"
            dpc_tmp_dir = "{root}/tmp"
            use_cache = true
            {extra}
            "#,
            root = root.display()
        ))
        .unwrap()
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn construction_creates_css_dir() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "");
        StyleBuilder::new(&cfg, GrassCompiler).unwrap();
        assert!(tmp.path().join("output/css").is_dir());
    }

    #[test]
    fn load_paths_include_dependency_subdir() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "[tasks]\n_dependencies = \"github\"\n_styles = true");
        let builder = StyleBuilder::new(&cfg, GrassCompiler).unwrap();
        let source = tmp.path().join("_styles/site.scss");

        assert_eq!(
            builder.load_paths(&source),
            vec![
                tmp.path().join("_styles"),
                tmp.path().join("_dependencies/github"),
            ]
        );
        assert_eq!(builder.output_path(&source), tmp.path().join("output/css/site.css"));
    }

    #[test]
    fn load_paths_without_dependencies() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "[tasks]\n_dependencies = true");
        let builder = StyleBuilder::new(&cfg, GrassCompiler).unwrap();
        let source = tmp.path().join("_styles/site.scss");
        assert_eq!(builder.load_paths(&source), vec![tmp.path().join("_styles")]);
    }

    #[test]
    fn compiles_scss_to_css_dir() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "");
        let source = tmp.path().join("_styles/site.scss");
        write(&source, "$brand: red;\nbody { color: $brand; }\n");
        let builder = StyleBuilder::new(&cfg, GrassCompiler).unwrap();

        builder.run(&StyleJob { source }).unwrap();

        let css = fs::read_to_string(tmp.path().join("output/css/site.css")).unwrap();
        assert!(css.contains("color: red"));
        assert!(!css.contains("$brand"));
    }

    #[test]
    fn imports_resolve_from_dependencies() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "[tasks]\n_dependencies = \"github\"");
        write(
            &tmp.path().join("_dependencies/github/theme/_colors.scss"),
            "$accent: #336699;\n",
        );
        let source = tmp.path().join("_styles/site.scss");
        write(&source, "@import \"theme/colors\";\na { color: $accent; }\n");
        let builder = StyleBuilder::new(&cfg, GrassCompiler).unwrap();

        builder.run(&StyleJob { source }).unwrap();

        let css = fs::read_to_string(tmp.path().join("output/css/site.css")).unwrap();
        assert!(css.contains("#336699"));
    }

    #[test]
    fn compile_error_is_reported() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path(), "");
        let source = tmp.path().join("_styles/broken.scss");
        write(&source, "a { color: $undefined; }\n");
        let builder = StyleBuilder::new(&cfg, GrassCompiler).unwrap();

        let err = builder.run(&StyleJob { source }).unwrap_err();
        assert!(matches!(err, TaskError::Compile { .. }));
        assert!(!tmp.path().join("output/css/broken.css").exists());
    }

    #[test]
    fn handler_name_is_extension() {
        let tmp = TempDir::new().unwrap();
        let builder = StyleBuilder::new(&config(tmp.path(), ""), GrassCompiler).unwrap();
        assert_eq!(builder.name(), "scss");
    }
}
