//! End-to-end build from a cached board.
//!
//! Writes a config file and a board cache into a temp dir, then runs the same
//! calls the `build` command makes: load config, pick the source, build with
//! the default handlers. The dependency archive is a local zip so nothing
//! touches the network.

use board_site::board::{BoardCache, BoardDocuments};
use board_site::builder::ExportRecord;
use board_site::config::load_config;
use board_site::site::{self, BuildReport};
use board_site::tasks::HandlerRegistry;
use board_site::tree::FieldValue;
use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const CONFIG: &str = r#"
dpc_root = "site"
dpc_input_dir = "site/pages"
dpc_output_dir = "site/public"
dpc_tmp_dir = "site/tmp"
use_cache = true
home_page_title = "Home"
head_stylesheets = ["/css/site.css"]

[tasks]
assets = true
_dependencies = "github"
_styles = true
"#;

fn write_theme_zip(path: &Path) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("_colors.scss", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(b"$accent: #336699;\n").unwrap();
    zip.finish().unwrap();
}

fn board_documents(theme_zip: &Path) -> BoardDocuments {
    let manifest = json!({ "theme": theme_zip.display().to_string() }).to_string();
    BoardDocuments {
        board: json!({ "id": "b1", "name": "Recipes", "desc": "# Welcome" }).to_string(),
        lists: json!([
            { "id": "l1", "name": "Starters" },
            { "id": "l2", "name": "/assets" },
            { "id": "l3", "name": "/_dependencies" },
            { "id": "l4", "name": "/_styles" },
            { "id": "l5", "name": "Mains" },
        ])
        .to_string(),
        cards: json!([
            {
                "id": "c1", "name": "Starters", "idList": "l1",
                "desc": "Soup takes {{ site.children[0].children[0].body_data['prep-time'] }} minutes."
            },
            {
                "id": "c2", "name": "Soup", "idList": "l1", "desc": "Hot",
                "customFieldItems": [
                    { "id": "i1", "idCustomField": "f1", "value": { "number": "42" } },
                    { "id": "i2", "idCustomField": "f2", "idValue": "opt1" }
                ]
            },
            { "id": "c3", "name": "img/logo.png", "idList": "l2", "desc": "PNGDATA" },
            { "id": "c4", "name": "github.json", "idList": "l3", "desc": manifest },
            {
                "id": "c5", "name": "site.scss", "idList": "l4",
                "desc": "@import \"theme/colors\";\nbody { color: $accent; }\n"
            },
        ])
        .to_string(),
        fields: json!([
            { "id": "f1", "name": "Prep Time", "type": "number" },
            { "id": "f2", "name": "Course", "type": "list" },
        ])
        .to_string(),
    }
}

struct Built {
    tmp: TempDir,
    report: BuildReport,
}

impl Built {
    fn site(&self) -> PathBuf {
        self.tmp.path().join("site")
    }
}

fn build_site() -> Built {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("board-site.toml");
    fs::write(&config_path, CONFIG).unwrap();
    let theme_zip = tmp.path().join("theme.zip");
    write_theme_zip(&theme_zip);

    let config = load_config(&config_path).unwrap();
    BoardCache::new(config.cache_dir())
        .store(&board_documents(&theme_zip))
        .unwrap();

    let source = site::board_source(&config, false).unwrap();
    let registry = HandlerRegistry::with_defaults(&config).unwrap();
    let report = site::build(&config, source.as_ref(), &registry).unwrap();
    Built { tmp, report }
}

/// Render a materialized page against a base with only a content block.
fn render_content(file: &Path) -> String {
    let source = fs::read_to_string(file).unwrap();
    let mut env = minijinja::Environment::new();
    env.add_template("structure.html", "{% block content %}{% endblock %}")
        .unwrap();
    env.render_str(&source, minijinja::context! {}).unwrap()
}

#[test]
fn home_page_renders_board_description() {
    let built = build_site();
    let tree = &built.report.tree;
    let root = tree.get(tree.root());

    assert_eq!(root.path, "/");
    assert_eq!(root.title, "Home");
    assert_eq!(root.site_title, "Recipes");
    assert_eq!(root.body, "<h1>Welcome</h1>\n");
    assert_eq!(
        render_content(&built.site().join("pages/index.html.jinja")),
        "<h1>Welcome</h1>\n"
    );
}

#[test]
fn intro_card_reads_sibling_field_data() {
    let built = build_site();
    let tree = &built.report.tree;
    let starters = tree.get(tree.find("/starters/").unwrap());

    assert_eq!(starters.body, "<p>Soup takes 42 minutes.</p>\n");
    assert_eq!(
        render_content(&built.site().join("pages/starters/index.html.jinja")),
        "<p>Soup takes 42 minutes.</p>\n"
    );
}

#[test]
fn number_field_lands_in_body_data() {
    let built = build_site();
    let tree = &built.report.tree;
    let soup = tree.get(tree.find("/starters/soup/").unwrap());

    assert_eq!(
        soup.body_data.get("prep-time"),
        Some(&FieldValue::Number(42i64.into()))
    );
    assert!(!soup.body_data.contains_key("course"));
    assert_eq!(built.report.skipped_fields.len(), 1);
    assert_eq!(built.report.skipped_fields[0].page_path, "/starters/soup/");
}

#[test]
fn folder_cards_are_exported_and_registered() {
    let built = build_site();
    let site = built.site();

    assert_eq!(
        fs::read_to_string(site.join("assets/img/logo.png")).unwrap(),
        "PNGDATA"
    );
    assert_eq!(
        built.report.tasks_found["assets"],
        vec![ExportRecord {
            task_name: "logo".into(),
            file_path: site.join("assets/img/logo.png"),
        }]
    );
    assert_eq!(built.report.exported_files, 3);
    assert_eq!(built.report.folders.len(), 3);
    assert!(built.report.tree.find("/assets/").is_none());
}

#[test]
fn one_template_per_page() {
    let built = build_site();
    let pages = built.site().join("pages");

    let mut written: Vec<String> = WalkDir::new(&pages)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(&pages)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    written.sort();

    assert_eq!(
        written,
        vec![
            "index.html.jinja",
            "mains/index.html.jinja",
            "starters/index.html.jinja",
            "starters/soup/index.html.jinja",
        ]
    );
    assert_eq!(built.report.pages_written, 4);
    // root, Starters (intro card) and Soup; Mains has no intro
    assert_eq!(built.report.bodies_rendered, 3);
}

#[test]
fn head_stylesheets_reach_every_page() {
    let built = build_site();
    let soup = fs::read_to_string(built.site().join("pages/starters/soup/index.html.jinja")).unwrap();
    assert!(soup.contains(r#"<link rel="stylesheet" href="/css/site.css">"#));
    assert!(soup.starts_with("{% extends \"structure.html\" %}"));
}

#[test]
fn styles_compile_against_fetched_dependencies() {
    let built = build_site();
    let site = built.site();

    assert!(site.join("_dependencies/github/theme/_colors.scss").is_file());
    assert!(site.join("tmp/theme.zip").is_file());

    let css = fs::read_to_string(site.join("public/css/site.css")).unwrap();
    assert!(css.contains("#336699"));

    let groups: Vec<&str> = built.report.tasks.completed.iter().map(|r| r.group).collect();
    assert_eq!(groups, vec!["_dependencies", "_styles"]);
    assert!(built.report.tasks.skipped.is_empty());
}
