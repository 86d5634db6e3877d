//! The content tree.
//!
//! Pages live in an arena ([`SiteTree`]) and refer to each other by
//! [`PageId`]. Children hold the forward edge in insertion order; the parent
//! link is a plain index, so there are no ownership cycles and every walk is
//! an index walk.
//!
//! The tree owns the path invariant: the root is `/`, and a child's path is
//! always its parent's path followed by its slug and a trailing slash. Paths
//! are unique across the tree.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Two pages resolve to the same path: {0}")]
    DuplicatePath(String),
    #[error("Page `{0}` has a name that produces an empty slug")]
    EmptySlug(String),
}

/// Index of a page in its [`SiteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// A typed custom field value on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
}

/// A node of the content tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub path: String,
    pub slug: String,
    pub title: String,
    pub site_title: String,
    /// Raw description until the body renderer replaces it with HTML.
    pub body: String,
    /// Slugified custom field name → value.
    pub body_data: BTreeMap<String, FieldValue>,
    pub head_stylesheets: Vec<String>,
    pub head_style: Option<String>,
    pub(crate) parent: Option<PageId>,
    pub(crate) children: Vec<PageId>,
}

impl Page {
    pub fn parent(&self) -> Option<PageId> {
        self.parent
    }

    pub fn children(&self) -> &[PageId] {
        &self.children
    }
}

/// Arena of pages rooted at `/`.
#[derive(Debug, Clone)]
pub struct SiteTree {
    pages: Vec<Page>,
    by_path: HashMap<String, PageId>,
}

impl SiteTree {
    /// Start a tree with `root` at path `/`.
    pub fn new(mut root: Page) -> Self {
        root.path = "/".to_string();
        root.parent = None;
        root.children.clear();
        let mut by_path = HashMap::new();
        by_path.insert(root.path.clone(), PageId(0));
        Self {
            pages: vec![root],
            by_path,
        }
    }

    pub fn root(&self) -> PageId {
        PageId(0)
    }

    /// Attach `page` under `parent`, deriving its path from the parent's.
    pub fn add_child(&mut self, parent: PageId, mut page: Page) -> Result<PageId, TreeError> {
        if page.slug.is_empty() {
            return Err(TreeError::EmptySlug(page.title));
        }
        let path = format!("{}{}/", self.pages[parent.0].path, page.slug);
        if self.by_path.contains_key(&path) {
            return Err(TreeError::DuplicatePath(path));
        }
        let id = PageId(self.pages.len());
        page.path = path.clone();
        page.parent = Some(parent);
        page.children.clear();
        self.pages.push(page);
        self.pages[parent.0].children.push(id);
        self.by_path.insert(path, id);
        Ok(id)
    }

    pub fn get(&self, id: PageId) -> &Page {
        &self.pages[id.0]
    }

    pub fn find(&self, path: &str) -> Option<PageId> {
        self.by_path.get(path).copied()
    }

    /// Replace a page's body.
    pub fn set_body(&mut self, id: PageId, body: String) {
        self.pages[id.0].body = body;
    }

    /// Set one `body_data` entry.
    pub fn set_data(&mut self, id: PageId, key: String, value: FieldValue) {
        self.pages[id.0].body_data.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page ids in depth-first pre-order from the root.
    pub fn walk(&self) -> Vec<PageId> {
        self.walk_from(self.root())
    }

    /// `start` and its descendants in depth-first pre-order.
    pub fn walk_from(&self, start: PageId) -> Vec<PageId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev());
        }
        order
    }

    /// Depth of a page below the root (root = 0).
    pub fn depth(&self, id: PageId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).parent;
        }
        depth
    }

    /// Owned, nested view of the whole tree for template contexts.
    pub fn snapshot(&self) -> PageSnapshot {
        self.snapshot_from(self.root())
    }

    fn snapshot_from(&self, id: PageId) -> PageSnapshot {
        let page = self.get(id);
        PageSnapshot {
            path: page.path.clone(),
            slug: page.slug.clone(),
            title: page.title.clone(),
            site_title: page.site_title.clone(),
            body: page.body.clone(),
            body_data: page.body_data.clone(),
            head_stylesheets: page.head_stylesheets.clone(),
            head_style: page.head_style.clone(),
            children: page
                .children
                .iter()
                .map(|&child| self.snapshot_from(child))
                .collect(),
        }
    }
}

/// Serializable copy of a page and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub path: String,
    pub slug: String,
    pub title: String,
    pub site_title: String,
    pub body: String,
    pub body_data: BTreeMap<String, FieldValue>,
    pub head_stylesheets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_style: Option<String>,
    pub children: Vec<PageSnapshot>,
}
