//! CLI output formatting for the build and fetch commands.
//!
//! # Information-First Display
//!
//! Pages are listed by title with their URL path, indented by depth, so the
//! output reads as the site's table of contents. Filesystem paths appear only
//! for exports and task runs, where the file is the identity.
//!
//! # Output Format
//!
//! ## Pages
//!
//! ```text
//! Pages
//! 001 Home → /
//!     Body: Welcome
//!     001 Starters → /starters/
//!         001 Soup → /starters/soup/
//!             Body: Hot
//!             Data: prep-time
//! ```
//!
//! ## Exports and tasks
//!
//! ```text
//! Exports
//!     site/_styles (1 file)
//!     _styles
//!         site ← site/_styles/site.scss
//!
//! Tasks
//!     _styles scss ✓ site/_styles/site.scss
//!     ✗ No _dependencies handler `gitlab` for site/_dependencies/gitlab.json
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::board::BoardData;
use crate::builder::{FolderListMap, SkipReason, SkippedField, SkippedPage, TasksFound};
use crate::site::BuildReport;
use crate::tasks::TaskReport;
use crate::tree::SiteTree;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// First non-empty line of a rendered body, as plain text.
fn body_preview(body: &str) -> Option<String> {
    let text = strip_html_tags(body);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(truncate_desc(line, 40))
}

// ============================================================================
// Pages
// ============================================================================

/// Format the page tree, pre-order, positional index per sibling level.
pub fn format_tree_output(tree: &SiteTree) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for id in tree.walk() {
        let page = tree.get(id);
        let depth = tree.depth(id);
        let position = page
            .parent()
            .and_then(|parent| tree.get(parent).children().iter().position(|&c| c == id))
            .map_or(1, |i| i + 1);
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(depth),
            format_index(position),
            page.title,
            page.path
        ));
        if let Some(preview) = body_preview(&page.body) {
            lines.push(format!("{}Body: {}", indent(depth + 1), preview));
        }
        if !page.body_data.is_empty() {
            let keys: Vec<&str> = page.body_data.keys().map(String::as_str).collect();
            lines.push(format!("{}Data: {}", indent(depth + 1), keys.join(", ")));
        }
    }
    lines
}

// ============================================================================
// Exports
// ============================================================================

/// Format folder-list exports and the task groups they feed.
pub fn format_export_output(
    folders: &FolderListMap,
    tasks_found: &TasksFound,
    exported_files: usize,
) -> Vec<String> {
    if folders.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Exports".to_string()];
    for dir in folders.values() {
        lines.push(format!("{}{}", indent(1), dir.display()));
    }
    for (group, records) in tasks_found {
        lines.push(format!("{}{}", indent(1), group));
        for record in records {
            lines.push(format!(
                "{}{} \u{2190} {}",
                indent(2),
                record.task_name,
                record.file_path.display()
            ));
        }
    }
    lines.push(format!(
        "Exported {} {} into {} {}",
        exported_files,
        plural(exported_files, "file", "files"),
        folders.len(),
        plural(folders.len(), "folder", "folders")
    ));
    lines
}

/// Format custom field values that were left off their pages.
pub fn format_skipped_fields(skipped: &[SkippedField]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Skipped fields".to_string()];
    for field in skipped {
        let reason = match &field.reason {
            SkipReason::UnknownField => "unknown field".to_string(),
            SkipReason::UnhandledType(t) => format!("unhandled type `{t}`"),
            SkipReason::MalformedValue(t) => format!("malformed {t} value"),
        };
        lines.push(format!(
            "{}{} {}: {}",
            indent(1),
            field.page_path,
            field.field,
            reason
        ));
    }
    lines
}

/// Format lists and cards that did not become pages.
pub fn format_skipped_pages(skipped: &[SkippedPage]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Skipped pages".to_string()];
    for page in skipped {
        lines.push(format!("{}{}: {}", indent(1), page.name, page.reason));
    }
    lines
}

// ============================================================================
// Tasks
// ============================================================================

/// Format completed and skipped task runs.
pub fn format_task_report(report: &TaskReport) -> Vec<String> {
    if report.completed.is_empty() && report.skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Tasks".to_string()];
    for run in &report.completed {
        lines.push(format!(
            "{}{} {} \u{2713} {}",
            indent(1),
            run.group,
            run.handler,
            run.file.display()
        ));
    }
    for err in &report.skipped {
        lines.push(format!("{}\u{2717} {}", indent(1), err));
    }
    lines
}

// ============================================================================
// Commands
// ============================================================================

/// Format everything a `build` produced, ending with a summary line.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = format_tree_output(&report.tree);
    for section in [
        format_export_output(&report.folders, &report.tasks_found, report.exported_files),
        format_skipped_pages(&report.skipped_pages),
        format_skipped_fields(&report.skipped_fields),
        format_task_report(&report.tasks),
    ] {
        if !section.is_empty() {
            lines.push(String::new());
            lines.extend(section);
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Wrote {} page {}, rendered {} {}, ran {} {} ({} skipped)",
        report.pages_written,
        plural(report.pages_written, "template", "templates"),
        report.bodies_rendered,
        plural(report.bodies_rendered, "body", "bodies"),
        report.tasks.completed.len(),
        plural(report.tasks.completed.len(), "task", "tasks"),
        report.tasks.skipped.len()
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

/// Format a summary of freshly fetched board data.
pub fn format_fetch_output(board: &BoardData) -> Vec<String> {
    vec![format!(
        "Fetched \"{}\": {} lists, {} cards, {} custom fields",
        board.board.name,
        board.lists.len(),
        board.cards.len(),
        board.fields.len()
    )]
}

pub fn print_fetch_output(board: &BoardData) {
    for line in format_fetch_output(board) {
        println!("{}", line);
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

// ============================================================================
// Tests
// ============================================================================
