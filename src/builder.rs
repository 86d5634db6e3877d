//! Tree construction from board records.
//!
//! Stage 1 of the pipeline. Walks the lists once, then the cards once, and
//! classifies each record:
//!
//! ```text
//! Board "Recipes"               →  /                       (home page, board desc)
//! ├── List "Starters"           →  /starters/              (parent page)
//! │   ├── Card "Starters"       →  body of /starters/      (section intro)
//! │   └── Card "Soup"           →  /starters/soup/         (leaf page)
//! └── List "/assets"            →  <dpc_root>/assets/      (folder list, no page)
//!     └── Card "img/logo.png"   →  <dpc_root>/assets/img/logo.png
//! ```
//!
//! Besides the tree, the builder returns the export registry consumed by the
//! task pipeline, and the side table of pages whose body must be rendered.
//!
//! ## Task groups
//!
//! A folder card's file is filed under a task group when one of its directory
//! segments names a configured task. Segments are tried from the deepest one
//! up to the folder itself, so with `assets` configured both
//! `/assets` → `logo.png` and `/assets` → `img/logo.png` land in the `assets`
//! group, while `/theme` → `_styles/site.scss` lands in `_styles`.

use crate::board::{BoardData, Card, CustomFieldItem};
use crate::config::Config;
use crate::dirs;
use crate::fields::{FieldError, FieldTable};
use crate::naming::{self, slugify};
use crate::tree::{FieldValue, Page, PageId, SiteTree, TreeError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Field error: {0}")]
    Field(#[from] FieldError),
    #[error("Card `{card}` references list `{list}`, which is not on the board")]
    UnknownList { card: String, list: String },
}

/// List id → output directory of a folder list.
pub type FolderListMap = BTreeMap<String, PathBuf>;

/// Task group → exported files, in card order.
pub type TasksFound = BTreeMap<String, Vec<ExportRecord>>;

/// A file exported by a folder card that belongs to a task group.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    /// Stem of the exported file; selects the handler inside its group.
    pub task_name: String,
    pub file_path: PathBuf,
}

/// A custom field value that could not be projected onto a page.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    pub page_path: String,
    pub field: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The card references a field id missing from the board's definitions.
    UnknownField,
    /// A field type the projection has no mapping for.
    UnhandledType(String),
    /// A handled type whose value is absent or not of that type.
    MalformedValue(String),
}

/// A list or card left out of the tree because its page could not be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPage {
    /// List or card name as it appears on the board.
    pub name: String,
    pub reason: TreeError,
}

/// Everything the tree builder produces.
#[derive(Debug)]
pub struct BuiltSite {
    pub tree: SiteTree,
    pub folders: FolderListMap,
    pub tasks_found: TasksFound,
    /// Pages whose body was assigned during the walk, each listed once.
    pub body_refs: Vec<PageId>,
    /// Number of files written for folder cards.
    pub exported_files: usize,
    pub skipped_fields: Vec<SkippedField>,
    /// Pages whose slug was empty or whose path was already taken.
    pub skipped_pages: Vec<SkippedPage>,
}

/// Classify every list and card of `board` and assemble the site.
///
/// Folder lists and their cards are written to disk under `dpc_root` as a
/// side effect; no page files are written here.
pub fn build_tree(board: &BoardData, config: &Config) -> Result<BuiltSite, BuildError> {
    let field_table = FieldTable::from_fields(&board.fields)?;

    let root = Page {
        slug: slugify(&board.board.name),
        title: config.home_page_title.clone(),
        site_title: board.board.name.clone(),
        body: board.board.desc.clone(),
        head_stylesheets: config.head_stylesheets.clone(),
        head_style: config.head_style.clone(),
        ..Page::default()
    };

    let mut site = BuiltSite {
        tree: SiteTree::new(root),
        folders: FolderListMap::new(),
        tasks_found: TasksFound::new(),
        body_refs: Vec::new(),
        exported_files: 0,
        skipped_fields: Vec::new(),
        skipped_pages: Vec::new(),
    };
    site.body_refs.push(site.tree.root());

    // list id → (parent page, list name)
    let mut parents: HashMap<&str, (PageId, &str)> = HashMap::new();
    // list id → folder name with the sentinel trimmed
    let mut folder_names: HashMap<&str, String> = HashMap::new();
    // lists that produced neither a page nor a folder
    let mut skipped_lists: HashSet<&str> = HashSet::new();

    for list in &board.lists {
        if let Some(name) = naming::folder_name(&list.name) {
            if name.is_empty() {
                tracing::warn!(list = %list.name, "folder list without a folder name, skipped");
                skipped_lists.insert(&list.id);
                continue;
            }
            let dir = config.dpc_root.join(&name);
            dirs::ensure_dir(&dir)?;
            tracing::debug!(list = %list.name, dir = %dir.display(), "folder list");
            if config.has_task(&name) {
                site.tasks_found.entry(name.clone()).or_default();
            }
            site.folders.insert(list.id.clone(), dir);
            folder_names.insert(&list.id, name);
            continue;
        }

        let page = Page {
            slug: slugify(&list.name),
            title: list.name.clone(),
            site_title: board.board.name.clone(),
            head_stylesheets: config.head_stylesheets.clone(),
            head_style: config.head_style.clone(),
            ..Page::default()
        };
        let root = site.tree.root();
        let Some(id) = add_page(&mut site, root, page) else {
            skipped_lists.insert(&list.id);
            continue;
        };
        tracing::debug!(list = %list.name, path = %site.tree.get(id).path, "parent page");
        parents.insert(&list.id, (id, &list.name));
    }

    for card in &board.cards {
        if let Some(folder) = site.folders.get(&card.id_list).cloned() {
            let folder_name = folder_names
                .get(card.id_list.as_str())
                .map(String::as_str)
                .unwrap_or("");
            export_card(&mut site, card, &folder, folder_name, config)?;
            continue;
        }

        if skipped_lists.contains(card.id_list.as_str()) {
            tracing::debug!(card = %card.name, "card on a skipped list");
            continue;
        }

        let Some(&(parent, list_name)) = parents.get(card.id_list.as_str()) else {
            return Err(BuildError::UnknownList {
                card: card.name.clone(),
                list: card.id_list.clone(),
            });
        };

        if card.name == list_name {
            tracing::debug!(card = %card.name, "section intro");
            site.tree.set_body(parent, card.desc.clone());
            if !site.body_refs.contains(&parent) {
                site.body_refs.push(parent);
            }
            continue;
        }

        let page = Page {
            slug: slugify(&card.name),
            title: card.name.clone(),
            site_title: board.board.name.clone(),
            body: card.desc.clone(),
            head_stylesheets: config.head_stylesheets.clone(),
            head_style: config.head_style.clone(),
            ..Page::default()
        };
        let Some(id) = add_page(&mut site, parent, page) else {
            continue;
        };
        site.body_refs.push(id);
        tracing::debug!(card = %card.name, path = %site.tree.get(id).path, "leaf page");

        for item in &card.custom_field_items {
            project_field(&mut site, id, item, &field_table);
        }
    }

    tracing::info!(
        pages = site.tree.len(),
        folders = site.folders.len(),
        exported = site.exported_files,
        "content tree built"
    );
    Ok(site)
}

/// Insert `page` under `parent`, or record why it could not be placed.
fn add_page(site: &mut BuiltSite, parent: PageId, page: Page) -> Option<PageId> {
    let name = page.title.clone();
    match site.tree.add_child(parent, page) {
        Ok(id) => Some(id),
        Err(reason) => {
            tracing::warn!(page = %name, %reason, "page skipped");
            site.skipped_pages.push(SkippedPage { name, reason });
            None
        }
    }
}

/// Write a folder card's description to its file and file it under a task.
fn export_card(
    site: &mut BuiltSite,
    card: &Card,
    folder: &Path,
    folder_name: &str,
    config: &Config,
) -> Result<(), BuildError> {
    let Some(export) = naming::parse_export_path(&card.name) else {
        tracing::warn!(card = %card.id, "folder card without a file name, skipped");
        return Ok(());
    };

    let dir = folder.join(&export.dir);
    if !export.dir.as_os_str().is_empty() {
        dirs::ensure_dir_like(&dir, folder)?;
    }
    let file_path = dir.join(&export.file_name);
    fs::write(&file_path, &card.desc)?;
    site.exported_files += 1;
    tracing::debug!(file = %file_path.display(), "exported folder card");

    let mut segments = vec![folder_name.to_string()];
    segments.extend(export.segments());
    if let Some(group) = segments.iter().rev().find(|s| config.has_task(s)) {
        let task_name = Path::new(&export.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        site.tasks_found
            .entry(group.clone())
            .or_default()
            .push(ExportRecord {
                task_name,
                file_path,
            });
    }
    Ok(())
}

/// Project one custom field item onto a leaf page's `body_data`.
fn project_field(site: &mut BuiltSite, id: PageId, item: &CustomFieldItem, fields: &FieldTable) {
    let page_path = site.tree.get(id).path.clone();
    let (Some(name), Some(field_type)) = (
        fields.name(&item.id_custom_field),
        fields.field_type(&item.id_custom_field),
    ) else {
        tracing::warn!(page = %page_path, field = %item.id_custom_field, "unknown custom field");
        site.skipped_fields.push(SkippedField {
            page_path,
            field: item.id_custom_field.clone(),
            reason: SkipReason::UnknownField,
        });
        return;
    };

    match field_value(field_type, item) {
        Ok(value) => site.tree.set_data(id, slugify(name), value),
        Err(reason) => {
            tracing::warn!(page = %page_path, field = %name, ?reason, "unhandled custom field type");
            site.skipped_fields.push(SkippedField {
                page_path,
                field: name.to_string(),
                reason,
            });
        }
    }
}

/// Typed value of a custom field item. Only `number` and `text` are mapped.
fn field_value(field_type: &str, item: &CustomFieldItem) -> Result<FieldValue, SkipReason> {
    let raw = item.value.as_ref().and_then(|v| v.get(field_type));
    let malformed = || SkipReason::MalformedValue(field_type.to_string());
    match field_type {
        "number" => match raw {
            Some(serde_json::Value::Number(n)) => Ok(FieldValue::Number(n.clone())),
            Some(serde_json::Value::String(s)) => serde_json::from_str(s.trim())
                .map(FieldValue::Number)
                .map_err(|_| malformed()),
            _ => Err(malformed()),
        },
        "text" => match raw {
            Some(serde_json::Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            _ => Err(malformed()),
        },
        other => Err(SkipReason::UnhandledType(other.to_string())),
    }
}
