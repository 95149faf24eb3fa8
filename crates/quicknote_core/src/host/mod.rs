//! Boundaries to collaborators owned by the host environment.
//!
//! # Responsibility
//! - Define single-call contracts for window, clipboard, notification,
//!   save-dialog and markdown services.
//! - Ship default implementations usable outside a GUI shell.
//!
//! # Invariants
//! - Every contract is one request, one response; no callbacks.

use crate::model::note::NoteId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod clipboard;
pub mod markdown;
pub mod notification;

pub use clipboard::SystemClipboard;
pub use markdown::CommonMarkRenderer;
pub use notification::LogNotificationCenter;

/// Failure reported by a host collaborator.
#[derive(Debug)]
pub enum HostError {
    Clipboard(String),
    Dialog(String),
    Io(std::io::Error),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clipboard(message) => write!(f, "clipboard unavailable: {message}"),
            Self::Dialog(message) => write!(f, "save dialog failed: {message}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HostError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Window-management layer hosting editor surfaces.
pub trait WindowHost {
    /// Opens an editor surface for `note_id`.
    fn open_editor(&mut self, note_id: NoteId);
    /// Closes the editor surface for `note_id`, if open.
    fn close_editor(&mut self, note_id: NoteId);
}

/// Markdown to HTML conversion service.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> String;
}

/// System clipboard writer.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), HostError>;
}

/// User notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not decided yet; a request may prompt the user.
    Default,
}

/// Desktop notification service.
pub trait NotificationCenter {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&mut self) -> NotificationPermission;
    fn notify(&mut self, title: &str, body: &str);
}

/// One named extension filter offered by a save dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

/// File-save prompt. `Ok(None)` means the user dismissed it.
pub trait SaveDialog {
    fn pick_save_path(&mut self, filters: &[FileFilter]) -> Result<Option<PathBuf>, HostError>;
}
