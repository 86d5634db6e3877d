//! Page materialization.
//!
//! Stage 3 of the pipeline. Walks the rendered tree and writes one template
//! file per page at `<base_dir><path>index.<template_ext>`. The site's own
//! template engine renders those files later; this crate only produces them.
//!
//! ## Output
//!
//! ```text
//! input/
//! ├── index.html.jinja             # root page "/"
//! ├── starters/
//! │   ├── index.html.jinja         # list page "/starters/"
//! │   └── soup/
//! │       └── index.html.jinja     # card page "/starters/soup/"
//! └── ...
//! ```
//!
//! Each file extends the configured base template and fills four blocks:
//!
//! ```text
//! {% extends "structure.html" %}
//! {% block title %}...{% endblock %}
//! {% block head %}{{ super() }}...{% endblock %}
//! {% block heading %}...{% endblock %}
//! {% block content %}...{% endblock %}
//! ```
//!
//! ## Escaping
//!
//! Titles and head markup are produced with [maud](https://maud.lambda.xyz/),
//! so title text is HTML-escaped. Everything taken from the board sits inside
//! `{% raw %}` so rendered bodies are never expanded a second time. Rendering a
//! page file against a base that declares only
//! `{% block content %}{% endblock %}` yields exactly the page body.

use crate::config::Config;
use crate::dirs;
use crate::tree::{Page, PageId, SiteTree};
use maud::{Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Template file naming.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeOptions {
    /// Extension without leading dot, e.g. `html.jinja`.
    pub template_ext: String,
    /// Template every page extends.
    pub base_template: String,
}

impl MaterializeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            template_ext: config.template_ext.clone(),
            base_template: config.base_template.clone(),
        }
    }

    fn file_name(&self) -> String {
        format!("index.{}", self.template_ext)
    }
}

/// Write a template file for `root` and every page below it.
///
/// Returns the number of files written. The tree is not modified.
pub fn materialize(
    tree: &SiteTree,
    root: PageId,
    base_dir: &Path,
    options: &MaterializeOptions,
) -> Result<usize, GenerateError> {
    let mut written = 0;
    for id in tree.walk_from(root) {
        write_page(tree.get(id), base_dir, options)?;
        written += 1;
    }
    tracing::info!(pages = written, dir = %base_dir.display(), "page templates written");
    Ok(written)
}

/// Location of a page's template file below `base_dir`.
pub fn page_file(page: &Page, base_dir: &Path, options: &MaterializeOptions) -> PathBuf {
    base_dir
        .join(page.path.trim_start_matches('/'))
        .join(options.file_name())
}

fn write_page(
    page: &Page,
    base_dir: &Path,
    options: &MaterializeOptions,
) -> Result<(), GenerateError> {
    let file = page_file(page, base_dir, options);
    let io_err = |source| GenerateError::Write {
        path: file.clone(),
        source,
    };
    if let Some(dir) = file.parent() {
        dirs::ensure_dir(dir).map_err(io_err)?;
    }
    fs::write(&file, page_template(page, options)).map_err(io_err)?;
    tracing::debug!(path = %page.path, file = %file.display(), "wrote page template");
    Ok(())
}

/// The template source for one page.
pub fn page_template(page: &Page, options: &MaterializeOptions) -> String {
    let title = raw(&html! { (page.title) }.into_string());
    let head = raw(&head_markup(page).into_string());
    let content = raw(&page.body);
    format!(
        "{{% extends \"{base}\" %}}\n\
         {{% block title %}}{title}{{% endblock %}}\n\
         {{% block head %}}{{{{ super() }}}}{head}{{% endblock %}}\n\
         {{% block heading %}}{title}{{% endblock %}}\n\
         {{% block content %}}{content}{{% endblock %}}\n",
        base = options.base_template.replace('"', "\\\""),
    )
}

fn head_markup(page: &Page) -> Markup {
    html! {
        @for href in &page.head_stylesheets {
            link rel="stylesheet" href=(href);
        }
        @if let Some(style) = &page.head_style {
            style { (PreEscaped(style)) }
        }
    }
}

/// Wrap `text` so the template engine outputs it verbatim.
///
/// A raw block ends at the first `{%` that closes it, so every `{%` in the
/// text is emitted as a string expression between two raw blocks.
fn raw(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let escaped = text.replace("{%", "{% endraw %}{{ \"{%\" }}{% raw %}");
    format!("{{% raw %}}{escaped}{{% endraw %}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> MaterializeOptions {
        MaterializeOptions {
            template_ext: "html.jinja".into(),
            base_template: "structure.html".into(),
        }
    }

    fn page(slug: &str, title: &str, body: &str) -> Page {
        Page {
            slug: slug.into(),
            title: title.into(),
            body: body.into(),
            ..Page::default()
        }
    }

    fn sample_tree() -> SiteTree {
        let mut tree = SiteTree::new(page("recipes", "Home", "<h1>Welcome</h1>\n"));
        let root = tree.root();
        let starters = tree
            .add_child(root, page("starters", "Starters", "<p>Intro</p>\n"))
            .unwrap();
        tree.add_child(starters, page("soup", "Soup", "<p>Hot</p>\n"))
            .unwrap();
        tree.add_child(root, page("mains", "Mains", "")).unwrap();
        tree
    }

    /// Render a written page file against a base with only a content block.
    fn render_content(source: &str) -> String {
        let mut env = minijinja::Environment::new();
        env.add_template("structure.html", "{% block content %}{% endblock %}")
            .unwrap();
        env.render_str(source, minijinja::context! {}).unwrap()
    }

    #[test]
    fn writes_one_file_per_page() {
        let tmp = TempDir::new().unwrap();
        let tree = sample_tree();
        let written = materialize(&tree, tree.root(), tmp.path(), &options()).unwrap();

        assert_eq!(written, 4);
        assert!(tmp.path().join("index.html.jinja").is_file());
        assert!(tmp.path().join("starters/index.html.jinja").is_file());
        assert!(tmp.path().join("starters/soup/index.html.jinja").is_file());
        assert!(tmp.path().join("mains/index.html.jinja").is_file());
    }

    #[test]
    fn subtree_only_from_given_root() {
        let tmp = TempDir::new().unwrap();
        let tree = sample_tree();
        let starters = tree.find("/starters/").unwrap();
        let written = materialize(&tree, starters, tmp.path(), &options()).unwrap();

        assert_eq!(written, 2);
        assert!(!tmp.path().join("index.html.jinja").exists());
    }

    #[test]
    fn existing_directories_are_fine() {
        let tmp = TempDir::new().unwrap();
        let tree = sample_tree();
        materialize(&tree, tree.root(), tmp.path(), &options()).unwrap();
        let again = materialize(&tree, tree.root(), tmp.path(), &options()).unwrap();
        assert_eq!(again, 4);
    }

    #[test]
    fn template_extends_base_and_fills_blocks() {
        let source = page_template(&page("soup", "Soup", "<p>Hot</p>"), &options());
        assert!(source.starts_with("{% extends \"structure.html\" %}\n"));
        assert!(source.contains("{% block title %}{% raw %}Soup{% endraw %}{% endblock %}"));
        assert!(source.contains("{% block heading %}{% raw %}Soup{% endraw %}{% endblock %}"));
        assert!(source.contains("{% block head %}{{ super() }}{% endblock %}"));
        assert!(source.contains("{% block content %}{% raw %}<p>Hot</p>{% endraw %}{% endblock %}"));
    }

    #[test]
    fn title_is_html_escaped() {
        let source = page_template(&page("fish", "Fish & <Chips>", ""), &options());
        assert!(source.contains("Fish &amp; &lt;Chips&gt;"));
    }

    #[test]
    fn head_markup_lists_stylesheets_and_style() {
        let mut p = page("a", "A", "");
        p.head_stylesheets = vec!["/css/site.css".into()];
        p.head_style = Some("body { color: red; }".into());
        let source = page_template(&p, &options());
        assert!(source.contains(r#"<link rel="stylesheet" href="/css/site.css">"#));
        assert!(source.contains("<style>body { color: red; }</style>"));
    }

    #[test]
    fn content_block_renders_exactly_the_body() {
        let body = "<h1>Welcome</h1>\n<p>{{ not expanded }}</p>\n";
        let source = page_template(&page("r", "Home", body), &options());
        assert_eq!(render_content(&source), body);
    }

    #[test]
    fn template_tags_in_body_survive_verbatim() {
        let body = "<p>{% endraw %} and {% if x %}</p>";
        let source = page_template(&page("r", "Home", body), &options());
        assert_eq!(render_content(&source), body);
    }

    #[test]
    fn written_files_round_trip() {
        let tmp = TempDir::new().unwrap();
        let tree = sample_tree();
        materialize(&tree, tree.root(), tmp.path(), &options()).unwrap();

        let soup = fs::read_to_string(tmp.path().join("starters/soup/index.html.jinja")).unwrap();
        assert_eq!(render_content(&soup), "<p>Hot</p>\n");
        let mains = fs::read_to_string(tmp.path().join("mains/index.html.jinja")).unwrap();
        assert_eq!(render_content(&mains), "");
    }

    #[test]
    fn custom_extension_and_base() {
        let opts = MaterializeOptions {
            template_ext: "twig".into(),
            base_template: "layout.twig".into(),
        };
        let p = Page {
            path: "/a/".into(),
            ..page("a", "A", "")
        };
        assert_eq!(
            page_file(&p, Path::new("/site"), &opts),
            PathBuf::from("/site/a/index.twig")
        );
        assert!(page_template(&p, &opts).starts_with("{% extends \"layout.twig\" %}"));
    }
}
