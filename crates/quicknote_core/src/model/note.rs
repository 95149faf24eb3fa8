//! The note record shared by every backend and view.
//!
//! # Invariants
//! - `note_id` is assigned at creation and never changes.
//! - `note_text` is nullable at storage level; `None` reads as empty text.
//! - `user_id` is only populated by the hosted backend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable note identifier, string-encoded at every storage boundary.
pub type NoteId = Uuid;

/// One row of the `notes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: NoteId,
    #[serde(default)]
    pub note_text: Option<String>,
    /// Owner reference used by row-level access policy on the hosted backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Note {
    /// A fresh note with a generated id and empty text.
    pub fn new_empty() -> Self {
        Self::with_text(Uuid::new_v4(), "")
    }

    /// A note with a caller-provided id, used by import and test paths.
    pub fn with_text(note_id: NoteId, text: impl Into<String>) -> Self {
        Self {
            note_id,
            note_text: Some(text.into()),
            user_id: None,
        }
    }

    /// Text content, with storage `NULL` read as `""`.
    pub fn text(&self) -> &str {
        self.note_text.as_deref().unwrap_or("")
    }

    /// Whether `pattern` occurs in the text. Empty patterns match every note.
    pub fn contains(&self, pattern: &str) -> bool {
        pattern.is_empty() || self.text().contains(pattern)
    }
}
