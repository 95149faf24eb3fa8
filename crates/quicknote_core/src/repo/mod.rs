//! Note storage contract and its two backends.
//!
//! # Responsibility
//! - Define the one storage interface every view goes through.
//! - Keep SQL and HTTP details behind that interface.
//!
//! # Invariants
//! - Repositories report every failure; fail-open policy belongs to the
//!   service layer.
//! - Writes against a missing `note_id` return `RepoError::NotFound`.

use crate::db::DbError;
use crate::model::note::{Note, NoteId};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod remote_repo;
pub mod sqlite_repo;

pub use remote_repo::{RemoteConfig, RemoteNoteRepository};
pub use sqlite_repo::SqliteNoteRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer error shared by both backends.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    /// Hosted backend answered with a non-success status.
    Remote {
        status: u16,
        message: String,
    },
    Transport(reqwest::Error),
    /// Connection handle is unusable (poisoned lock).
    Unavailable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid note data: {message}"),
            Self::Remote { status, message } => {
                write!(f, "hosted backend returned {status}: {message}")
            }
            Self::Transport(err) => write!(f, "hosted backend unreachable: {err}"),
            Self::Unavailable(details) => write!(f, "note store unavailable: {details}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

/// Storage interface over the `notes` table.
pub trait NoteRepository: Send + Sync {
    /// Short backend label used in log events (`sqlite`, `remote`).
    fn backend_name(&self) -> &'static str;
    /// Notes whose text contains `pattern`; empty pattern returns all notes.
    fn search_notes(&self, pattern: &str) -> RepoResult<Vec<Note>>;
    /// One note by id.
    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>>;
    /// Inserts `note` and returns the stored row.
    fn create_note(&self, note: &Note) -> RepoResult<Note>;
    /// Overwrites `note_text` of one row.
    fn update_note_text(&self, note_id: NoteId, text: &str) -> RepoResult<()>;
    /// Deletes one row.
    fn remove_note(&self, note_id: NoteId) -> RepoResult<()>;
}

/// Storage backend chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Embedded SQLite file; `None` opens a throwaway in-memory store.
    Sqlite {
        #[serde(default)]
        path: Option<std::path::PathBuf>,
    },
    Remote(RemoteConfig),
}

/// Opens the configured backend behind the shared storage interface.
pub fn open_repository(config: &BackendConfig) -> RepoResult<Arc<dyn NoteRepository>> {
    let repo: Arc<dyn NoteRepository> = match config {
        BackendConfig::Sqlite { path: Some(path) } => Arc::new(SqliteNoteRepository::open(path)?),
        BackendConfig::Sqlite { path: None } => Arc::new(SqliteNoteRepository::open_in_memory()?),
        BackendConfig::Remote(remote) => Arc::new(RemoteNoteRepository::new(remote.clone())?),
    };
    Ok(repo)
}
