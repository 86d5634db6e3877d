//! Naming conventions shared by the tree builder and the renderers.
//!
//! Board records carry human names; this module turns them into URL slugs and
//! recognizes the two conventions encoded in names:
//!
//! - A list named `/assets` is a **folder list**: its cards are exported as
//!   raw files under `<dpc_root>/assets` instead of becoming pages.
//! - A card on a folder list is named by its relative file path, e.g.
//!   `img/logo.png`.
//!
//! ## Slugs
//!
//! Slugs are transliterated to ASCII, lowercased, and every run of characters
//! other than `[a-z0-9_]` becomes a single dash:
//! - `Prep Time` → `prep-time`
//! - `Crème Brûlée!` → `creme-brulee`
//! - `  Starters  ` → `starters`

use std::path::{Component, Path, PathBuf};

/// Leading character marking a folder list.
pub const FOLDER_SENTINEL: char = '/';

/// Convert a display name into a URL slug.
pub fn slugify(name: &str) -> String {
    let mut output = String::with_capacity(name.len());
    let mut need_dash = false;
    for ch in name.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }
                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }
    output
}

/// If `list_name` marks a folder list, return its folder below `dpc_root`.
///
/// The sentinel is trimmed and, as with export paths, only plain segments
/// are kept (`/assets/` → `assets`, `/../outside` → `outside`). A folder
/// list with no plain segment left yields an empty string.
pub fn folder_name(list_name: &str) -> Option<String> {
    let trimmed = list_name.strip_prefix(FOLDER_SENTINEL)?;
    Some(plain_segments(trimmed).join("/"))
}

/// The `Component::Normal` parts of a relative name.
fn plain_segments(name: &str) -> Vec<String> {
    Path::new(name.trim())
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

/// A folder card's name split into its directory part and file name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPath {
    /// Directory below the folder root. Empty for files in the root itself.
    pub dir: PathBuf,
    /// File name including extension.
    pub file_name: String,
}

impl ExportPath {
    /// Directory segments, outermost first.
    pub fn segments(&self) -> Vec<String> {
        self.dir
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect()
    }
}

/// Parse a folder card name such as `img/logo.png`.
///
/// Only plain segments are kept: `.`, `..` and leading separators are dropped
/// so an export can never escape its folder. Returns `None` if no file name is
/// left.
pub fn parse_export_path(card_name: &str) -> Option<ExportPath> {
    let mut parts = plain_segments(card_name);
    let file_name = parts.pop()?;
    Some(ExportPath {
        dir: parts.iter().collect(),
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_dashes() {
        assert_eq!(slugify("Prep Time"), "prep-time");
    }

    #[test]
    fn slug_collapses_runs() {
        assert_eq!(slugify("Soups -- & Stews"), "soups-stews");
    }

    #[test]
    fn slug_trims_edges() {
        assert_eq!(slugify("  Starters!  "), "starters");
    }

    #[test]
    fn slug_transliterates() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
    }

    #[test]
    fn slug_keeps_underscores_and_digits() {
        assert_eq!(slugify("Step_2 of 3"), "step_2-of-3");
    }

    #[test]
    fn slug_of_symbols_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn folder_name_detects_sentinel() {
        assert_eq!(folder_name("/assets"), Some("assets".into()));
        assert_eq!(folder_name("/_styles/"), Some("_styles".into()));
        assert_eq!(folder_name("Starters"), None);
        assert_eq!(folder_name("a/b"), None);
    }

    #[test]
    fn folder_name_cannot_leave_root() {
        assert_eq!(folder_name("/../outside"), Some("outside".into()));
        assert_eq!(folder_name("//etc/../x/"), Some("etc/x".into()));
        assert_eq!(folder_name("/.."), Some(String::new()));
    }

    #[test]
    fn export_path_with_directory() {
        let p = parse_export_path("img/logo.png").unwrap();
        assert_eq!(p.dir, PathBuf::from("img"));
        assert_eq!(p.file_name, "logo.png");
        assert_eq!(p.segments(), vec!["img".to_string()]);
    }

    #[test]
    fn export_path_without_directory() {
        let p = parse_export_path("github.json").unwrap();
        assert_eq!(p.dir, PathBuf::new());
        assert_eq!(p.file_name, "github.json");
        assert!(p.segments().is_empty());
    }

    #[test]
    fn export_path_nested() {
        let p = parse_export_path("a/b/c.scss").unwrap();
        assert_eq!(p.dir, PathBuf::from("a/b"));
        assert_eq!(p.segments(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn export_path_drops_parent_segments() {
        let p = parse_export_path("../../etc/passwd").unwrap();
        assert_eq!(p.dir, PathBuf::from("etc"));
        assert_eq!(p.file_name, "passwd");
    }

    #[test]
    fn export_path_drops_leading_separator() {
        let p = parse_export_path("/css/site.scss").unwrap();
        assert_eq!(p.dir, PathBuf::from("css"));
    }

    #[test]
    fn export_path_empty_is_none() {
        assert_eq!(parse_export_path(""), None);
        assert_eq!(parse_export_path("/"), None);
    }
}
