//! Board data: record types, the Trello API client, and the on-disk cache.
//!
//! A board export is four JSON documents (`board`, `lists`, `cards`,
//! `fields`). [`TrelloClient`] fetches them over HTTP and [`BoardCache`] reads
//! them from `<dpc_root>/_trello_cache/`; both implement [`BoardSource`] so the
//! rest of the pipeline never knows which one it is talking to.
//!
//! ## Cache policy
//!
//! An outdated cache is always better than no cache. Documents are written
//! only after all four were fetched and parsed, each through a temporary file
//! and a rename, and nothing in this crate ever deletes them. The API response
//! text is stored verbatim so the cache stays a drop-in substitute for the API.

use crate::config::TrelloCredentials;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TRELLO_API: &str = "https://api.trello.com/1";

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid {document} document: {source}")]
    Json {
        document: &'static str,
        source: serde_json::Error,
    },
    #[error("Board cache document not found: {0}")]
    MissingCache(PathBuf),
}

/// The board itself: its name becomes the site title, its description the
/// home page body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub id_list: String,
    #[serde(default)]
    pub custom_field_items: Vec<CustomFieldItem>,
}

/// A custom field value attached to a card.
///
/// `value` holds one key named after the field type (`{"number": "42"}`,
/// `{"text": "..."}`, `{"checked": "true"}`, ...). Dropdown fields carry
/// `idValue` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldItem {
    pub id_custom_field: String,
    #[serde(default)]
    pub value: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_value: Option<String>,
}

/// Custom field definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Everything the pipeline needs from a board, in the order received.
#[derive(Debug, Clone, Default)]
pub struct BoardData {
    pub board: Board,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub fields: Vec<CustomField>,
}

/// Something that can hand over a complete board.
pub trait BoardSource {
    fn fetch(&self) -> Result<BoardData, BoardError>;
}

/// Raw text of the four board documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardDocuments {
    pub board: String,
    pub lists: String,
    pub cards: String,
    pub fields: String,
}

impl BoardDocuments {
    const NAMES: [&'static str; 4] = ["board", "lists", "cards", "fields"];

    pub fn parse(&self) -> Result<BoardData, BoardError> {
        fn parse_doc<T: serde::de::DeserializeOwned>(
            document: &'static str,
            text: &str,
        ) -> Result<T, BoardError> {
            serde_json::from_str(text).map_err(|source| BoardError::Json { document, source })
        }
        Ok(BoardData {
            board: parse_doc("board", &self.board)?,
            lists: parse_doc("lists", &self.lists)?,
            cards: parse_doc("cards", &self.cards)?,
            fields: parse_doc("fields", &self.fields)?,
        })
    }

    fn texts(&self) -> [&str; 4] {
        [&self.board, &self.lists, &self.cards, &self.fields]
    }
}

/// The four cached documents under `_trello_cache/`.
#[derive(Debug, Clone)]
pub struct BoardCache {
    dir: PathBuf,
}

impl BoardCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Read all four documents. A missing document is an error; nothing is
    /// guessed.
    pub fn load(&self) -> Result<BoardDocuments, BoardError> {
        let read = |name: &str| -> Result<String, BoardError> {
            let path = self.document_path(name);
            if !path.is_file() {
                return Err(BoardError::MissingCache(path));
            }
            Ok(fs::read_to_string(path)?)
        };
        Ok(BoardDocuments {
            board: read("board")?,
            lists: read("lists")?,
            cards: read("cards")?,
            fields: read("fields")?,
        })
    }

    /// Write all four documents, replacing each one atomically.
    pub fn store(&self, documents: &BoardDocuments) -> Result<(), BoardError> {
        fs::create_dir_all(&self.dir)?;
        for (name, text) in BoardDocuments::NAMES.iter().zip(documents.texts()) {
            let path = self.document_path(name);
            let tmp = self.dir.join(format!(".{name}.json.tmp"));
            fs::write(&tmp, text)?;
            fs::rename(&tmp, &path)?;
        }
        tracing::debug!(dir = %self.dir.display(), "board cache written");
        Ok(())
    }
}

impl BoardSource for BoardCache {
    fn fetch(&self) -> Result<BoardData, BoardError> {
        self.load()?.parse()
    }
}

/// Blocking client for the four Trello board endpoints.
pub struct TrelloClient {
    credentials: TrelloCredentials,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl TrelloClient {
    pub fn new(credentials: TrelloCredentials) -> Self {
        Self {
            credentials,
            base_url: TRELLO_API.to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of a board resource; `""` is the board itself.
    pub fn endpoint(&self, resource: &str) -> String {
        let board = format!("{}/boards/{}", self.base_url, self.credentials.board_id);
        if resource.is_empty() {
            board
        } else {
            format!("{board}/{resource}")
        }
    }

    fn get(&self, resource: &str, extra: &[(&str, &str)]) -> Result<String, BoardError> {
        let url = self.endpoint(resource);
        tracing::debug!(%url, "fetching board document");
        let text = self
            .http
            .get(&url)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("token", self.credentials.token.as_str()),
            ])
            .query(extra)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(text)
    }

    /// Fetch the raw text of all four documents.
    pub fn fetch_documents(&self) -> Result<BoardDocuments, BoardError> {
        Ok(BoardDocuments {
            board: self.get("", &[])?,
            lists: self.get("lists", &[])?,
            cards: self.get("cards", &[("customFieldItems", "true")])?,
            fields: self.get("customFields", &[])?,
        })
    }
}

impl BoardSource for TrelloClient {
    fn fetch(&self) -> Result<BoardData, BoardError> {
        self.fetch_documents()?.parse()
    }
}

/// Fetch from the API and write the result through to the cache.
///
/// The cache is only touched once every document has been fetched and parsed,
/// so a failed refresh leaves the previous cache intact.
pub fn refresh_cache(client: &TrelloClient, cache: &BoardCache) -> Result<BoardData, BoardError> {
    let documents = client.fetch_documents()?;
    let data = documents.parse()?;
    cache.store(&documents)?;
    tracing::info!(
        lists = data.lists.len(),
        cards = data.cards.len(),
        "board cache refreshed"
    );
    Ok(data)
}
