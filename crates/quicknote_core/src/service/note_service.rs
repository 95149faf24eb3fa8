//! Note persistence service.
//!
//! # Responsibility
//! - Front one storage backend for every view controller.
//! - Publish typed change events after committed mutations.
//! - Offer both the fail-open call style (errors logged, empty/`None`
//!   results) and explicit `try_*` calls with typed errors.
//!
//! # Invariants
//! - Each successful mutation publishes exactly one event on the bus.
//! - Failed or no-op mutations publish nothing.
//! - Log events carry ids and statuses, never note text.

use crate::events::bus::{ChangeBus, NoteEvent};
use crate::model::note::{Note, NoteId};
use crate::repo::{NoteRepository, RepoError};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const PREVIEW_MAX_CHARS: usize = 80;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)]\([^)]*\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*_`#>~]+").expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

pub type ServiceResult<T> = Result<T, NoteServiceError>;

/// Service error taxonomy surfaced to view controllers.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target row does not exist.
    NoteNotFound(NoteId),
    /// Connection, query, transport or decoding failure.
    BackendUnavailable(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::BackendUnavailable(err) => write!(f, "note backend unavailable: {err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BackendUnavailable(err) => Some(err),
            Self::NoteNotFound(_) => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::BackendUnavailable(other),
        }
    }
}

/// Shared persistence handle; clones share the backend and the bus.
#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
    bus: ChangeBus,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>, bus: ChangeBus) -> Self {
        Self { repo, bus }
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn backend_name(&self) -> &'static str {
        self.repo.backend_name()
    }

    /// Notes containing `pattern`; an error is logged and yields `[]`.
    pub fn search(&self, pattern: &str) -> Vec<Note> {
        self.try_search(pattern).unwrap_or_default()
    }

    /// Inserts an empty note; an error is logged and yields `None`.
    pub fn create(&self) -> Option<Note> {
        self.try_create().ok()
    }

    /// Overwrites a note's text; missing rows and errors are logged no-ops.
    pub fn update(&self, note_id: NoteId, text: &str) {
        let _ = self.try_update(note_id, text);
    }

    /// Deletes a note; missing rows and errors are logged no-ops.
    pub fn remove(&self, note_id: NoteId) {
        let _ = self.try_remove(note_id);
    }

    pub fn try_search(&self, pattern: &str) -> ServiceResult<Vec<Note>> {
        match self.repo.search_notes(pattern) {
            Ok(notes) => {
                info!(
                    "event=note_search module=service status=ok backend={} pattern_chars={} hits={}",
                    self.backend_name(),
                    pattern.chars().count(),
                    notes.len()
                );
                Ok(notes)
            }
            Err(err) => Err(self.fail("note_search", None, err)),
        }
    }

    pub fn try_create(&self) -> ServiceResult<Note> {
        let draft = Note::new_empty();
        match self.repo.create_note(&draft) {
            Ok(note) => {
                self.committed("note_create", NoteEvent::Created(note.note_id));
                Ok(note)
            }
            Err(err) => Err(self.fail("note_create", Some(draft.note_id), err)),
        }
    }

    pub fn try_update(&self, note_id: NoteId, text: &str) -> ServiceResult<()> {
        match self.repo.update_note_text(note_id, text) {
            Ok(()) => {
                self.committed("note_update", NoteEvent::Updated(note_id));
                Ok(())
            }
            Err(err) => Err(self.fail("note_update", Some(note_id), err)),
        }
    }

    pub fn try_remove(&self, note_id: NoteId) -> ServiceResult<()> {
        match self.repo.remove_note(note_id) {
            Ok(()) => {
                self.committed("note_remove", NoteEvent::Deleted(note_id));
                Ok(())
            }
            Err(err) => Err(self.fail("note_remove", Some(note_id), err)),
        }
    }

    /// Loads one note; absence is `NoteNotFound`.
    pub fn load(&self, note_id: NoteId) -> ServiceResult<Note> {
        match self.repo.get_note(note_id) {
            Ok(Some(note)) => Ok(note),
            Ok(None) => Err(self.fail("note_load", Some(note_id), RepoError::NotFound(note_id))),
            Err(err) => Err(self.fail("note_load", Some(note_id), err)),
        }
    }

    fn committed(&self, event_name: &str, event: NoteEvent) {
        info!(
            "event={event_name} module=service status=ok backend={} note_id={}",
            self.backend_name(),
            event.note_id()
        );
        self.bus.publish(event);
    }

    fn fail(&self, event_name: &str, note_id: Option<NoteId>, err: RepoError) -> NoteServiceError {
        let note_id = note_id.map_or_else(|| "-".to_string(), |id| id.to_string());
        match &err {
            RepoError::NotFound(_) => info!(
                "event={event_name} module=service status=not_found backend={} note_id={note_id}",
                self.backend_name()
            ),
            other => warn!(
                "event={event_name} module=service status=error backend={} note_id={note_id} error={other}",
                self.backend_name()
            ),
        }
        err.into()
    }
}

/// One-line plain-text preview of markdown note text for list rows.
///
/// Images collapse to their alt text, links to their label, markdown
/// markers are stripped and whitespace is folded. Returns `""` for blank
/// notes.
pub fn derive_preview(text: &str) -> String {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(text, "$1");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let folded = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = folded.trim();

    let mut preview: String = trimmed.chars().take(PREVIEW_MAX_CHARS).collect();
    if trimmed.chars().count() > PREVIEW_MAX_CHARS {
        preview.push('…');
    }
    preview
}
