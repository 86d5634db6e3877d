//! # Board Site
//!
//! Builds a static site's page templates from a Trello board. The board is the
//! data source: lists become sections, cards become pages, and lists whose
//! name starts with `/` export their cards as raw files.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! ```text
//! 1. Build        board data  →  page tree, folder exports, task registry
//! 2. Render       page bodies →  template-expanded Markdown → HTML
//! 3. Materialize  page tree   →  <dpc_input_dir>/<path>/index.<ext>
//! 4. Tasks        registry    →  _dependencies, then _styles
//! ```
//!
//! The stages run in memory, in strict order, from [`site::build`]. Board data
//! comes through the [`board::BoardSource`] trait, either straight from the
//! Trello API or from the on-disk cache the API responses are written to.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`board`] | Trello board model, API client, on-disk cache |
//! | [`fields`] | Custom field id → name/type lookups |
//! | [`builder`] | Stage 1: classifies lists and cards, builds the tree, writes folder exports |
//! | [`tree`] | Arena page tree with path invariants and a serializable snapshot |
//! | [`render`] | Stage 2: template expansion (minijinja) then Markdown (pulldown-cmark) |
//! | [`generate`] | Stage 3: writes one extending template per page, head markup via Maud |
//! | [`tasks`] | Stage 4: dependency fetching (zip) and stylesheet compilation (grass) |
//! | [`site`] | Orchestrates the stages and picks the board source |
//! | [`config`] | `board-site.toml` loading and validation |
//! | [`naming`] | Slugs, folder-list names, export paths |
//! | [`dirs`] | Create-if-absent directory helpers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Snapshot for All Templates
//!
//! Body templates see the whole site as `site`. The snapshot is taken once,
//! before any body is rendered, so every template sees the same raw data no
//! matter where its page sits in the render order.
//!
//! ## The Cache Is Never Thrown Away
//!
//! An outdated board is better than no board. API responses are parsed before
//! they replace the cache, and each file is swapped in by rename. Nothing
//! deletes the cache; `board-site fetch` or `board-site build --refresh`
//! update it.
//!
//! ## Tasks Don't Fail the Build
//!
//! A broken manifest or stylesheet skips that one task with a warning. Pages
//! have already been written by then, and a partial asset set is more useful
//! than none.

pub mod board;
pub mod builder;
pub mod config;
pub mod dirs;
pub mod fields;
pub mod generate;
pub mod naming;
pub mod output;
pub mod render;
pub mod site;
pub mod tasks;
pub mod tree;
