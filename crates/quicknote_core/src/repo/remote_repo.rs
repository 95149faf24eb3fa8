//! Hosted table-service note repository.
//!
//! # Responsibility
//! - Map note CRUD onto a PostgREST-compatible REST endpoint
//!   (`{base_url}/rest/v1/{table}`).
//! - Attach the project key and the signed-in user's token to every call.
//!
//! # Invariants
//! - Writes ask for `return=representation`; an empty row set means the
//!   filter matched nothing and is reported as `NotFound`.
//! - Search uses the hosted `like` operator, which is case-sensitive.
//! - Row-level access policy is enforced server-side via `user_id`.

use crate::logging::sanitize_message;
use crate::model::note::{Note, NoteId};
use crate::repo::{NoteRepository, RepoError, RepoResult};
use crate::search::pattern::postgrest_like_filter;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_TABLE: &str = "notes";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Public project key sent as `apikey`.
    pub api_key: String,
    /// Signed-in user's access token; falls back to `api_key` when absent.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Owner written into new rows.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            user_id: None,
            table: default_table(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// REST endpoint of the notes table.
    pub fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Note repository backed by the hosted table service.
pub struct RemoteNoteRepository {
    client: Client,
    config: RemoteConfig,
    table_url: String,
}

impl RemoteNoteRepository {
    pub fn new(config: RemoteConfig) -> RepoResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let table_url = config.table_url();
        Ok(Self {
            client,
            config,
            table_url,
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(self.config.api_key.as_str());
        self.client
            .request(method, self.table_url.as_str())
            .header("apikey", self.config.api_key.as_str())
            .bearer_auth(bearer)
    }

    fn returning_rows(&self, method: Method) -> RequestBuilder {
        self.request(method).header("Prefer", "return=representation")
    }

    fn fetch_rows(&self, builder: RequestBuilder) -> RepoResult<Vec<Note>> {
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RepoError::Remote {
                status: status.as_u16(),
                message: sanitize_message(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }
        Ok(response.json::<Vec<Note>>()?)
    }
}

impl NoteRepository for RemoteNoteRepository {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    fn search_notes(&self, pattern: &str) -> RepoResult<Vec<Note>> {
        let mut builder = self.request(Method::GET).query(&[("select", "*")]);
        if let Some(filter) = postgrest_like_filter(pattern) {
            builder = builder.query(&[("note_text", filter.as_str())]);
        }
        self.fetch_rows(builder)
    }

    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        let filter = eq_filter(note_id);
        let builder = self
            .request(Method::GET)
            .query(&[("select", "*"), ("note_id", filter.as_str())]);
        Ok(self.fetch_rows(builder)?.into_iter().next())
    }

    fn create_note(&self, note: &Note) -> RepoResult<Note> {
        let mut row = note.clone();
        if row.user_id.is_none() {
            row.user_id = self.config.user_id.clone();
        }
        let builder = self.returning_rows(Method::POST).json(&[row]);
        self.fetch_rows(builder)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RepoError::InvalidData(format!("insert of note {} returned no row", note.note_id))
            })
    }

    fn update_note_text(&self, note_id: NoteId, text: &str) -> RepoResult<()> {
        let filter = eq_filter(note_id);
        let builder = self
            .returning_rows(Method::PATCH)
            .query(&[("note_id", filter.as_str())])
            .json(&json!({ "note_text": text }));
        if self.fetch_rows(builder)?.is_empty() {
            return Err(RepoError::NotFound(note_id));
        }
        Ok(())
    }

    fn remove_note(&self, note_id: NoteId) -> RepoResult<()> {
        let filter = eq_filter(note_id);
        let builder = self
            .returning_rows(Method::DELETE)
            .query(&[("note_id", filter.as_str())]);
        if self.fetch_rows(builder)?.is_empty() {
            return Err(RepoError::NotFound(note_id));
        }
        Ok(())
    }
}

fn eq_filter(note_id: NoteId) -> String {
    format!("eq.{note_id}")
}
