//! Two-pass body rendering.
//!
//! Stage 2 of the pipeline. Every collected body goes through exactly two
//! steps, in order:
//!
//! 1. **Template expansion** against `{ site: <whole tree> }`. The snapshot is
//!    taken once, after the tree is complete and before any body is touched,
//!    so a page can read any other page's data. Bodies seen through `site` are
//!    always the raw descriptions, never rendered HTML.
//! 2. **Markup transform**: Markdown to HTML.
//!
//! The result is written back through [`SiteTree::set_body`]. Only pages in
//! the builder's body side table are rendered, each exactly once.
//!
//! Both steps sit behind traits so tests can count and inspect calls; the
//! production pair is [`JinjaEngine`] (minijinja) and [`Markdown`]
//! (pulldown-cmark).

use crate::naming;
use crate::tree::{PageId, PageSnapshot, SiteTree};
use pulldown_cmark::{Parser, html as md_html};
use serde::Serialize;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template context could not be built: {0}")]
    Context(#[source] BoxError),
    #[error("Template error in {path}: {source}")]
    Template { path: String, source: BoxError },
}

/// What every body template is rendered against.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub site: PageSnapshot,
}

/// Template expansion.
pub trait TemplateEngine {
    /// Engine-specific form of the context, built once per run.
    type Context;

    fn prepare(&self, context: &RenderContext) -> Result<Self::Context, BoxError>;

    /// Render `source`; `name` identifies it in error messages.
    fn render(&self, name: &str, source: &str, context: &Self::Context) -> Result<String, BoxError>;
}

/// Text markup to HTML. Must be a pure function of its input.
pub trait MarkupTransform {
    fn transform(&self, text: &str) -> String;
}

/// Jinja-syntax templates via minijinja.
///
/// Besides the builtins, templates get a `slugify` filter matching the slugs
/// used for page paths.
pub struct JinjaEngine {
    env: minijinja::Environment<'static>,
}

impl JinjaEngine {
    pub fn new() -> Self {
        let mut env = minijinja::Environment::new();
        env.add_filter("slugify", |value: String| naming::slugify(&value));
        Self { env }
    }
}

impl Default for JinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for JinjaEngine {
    type Context = minijinja::Value;

    fn prepare(&self, context: &RenderContext) -> Result<Self::Context, BoxError> {
        Ok(minijinja::Value::from_serialize(context))
    }

    fn render(&self, name: &str, source: &str, context: &Self::Context) -> Result<String, BoxError> {
        Ok(self.env.render_named_str(name, source, context)?)
    }
}

/// CommonMark to HTML via pulldown-cmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl MarkupTransform for Markdown {
    fn transform(&self, text: &str) -> String {
        let parser = Parser::new(text);
        let mut html = String::new();
        md_html::push_html(&mut html, parser);
        html
    }
}

/// Render every body in `refs` and write it back into `tree`.
///
/// Returns the number of bodies rendered.
pub fn render_bodies<E, M>(
    tree: &mut SiteTree,
    refs: &[PageId],
    engine: &E,
    markup: &M,
) -> Result<usize, RenderError>
where
    E: TemplateEngine,
    M: MarkupTransform,
{
    let context = RenderContext {
        site: tree.snapshot(),
    };
    let context = engine.prepare(&context).map_err(RenderError::Context)?;

    for &id in refs {
        let page = tree.get(id);
        let expanded = engine
            .render(&page.path, &page.body, &context)
            .map_err(|source| RenderError::Template {
                path: page.path.clone(),
                source,
            })?;
        let html = markup.transform(&expanded);
        tree.set_body(id, html);
    }

    tracing::info!(bodies = refs.len(), "page bodies rendered");
    Ok(refs.len())
}
