//! Single-note editor controller.
//!
//! # Responsibility
//! - Load one note and hold its edit buffer.
//! - Toggle between raw text and rendered markdown.
//! - Save back, copy to the clipboard, and export to a file.
//!
//! # Invariants
//! - Nothing is persisted before an explicit `save`.
//! - A missing note is a `NotFound` error at load time.
//! - Rendered HTML is reused only while it was produced from the current
//!   buffer.
//! - `save` overwrites whatever is stored (last-write-wins), including
//!   edits saved meanwhile from another editor.

use crate::host::{
    Clipboard, FileFilter, HostError, MarkdownRenderer, NotificationCenter,
    NotificationPermission, SaveDialog, WindowHost,
};
use crate::model::note::NoteId;
use crate::service::note_service::{NoteService, NoteServiceError};
use log::{info, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const COPY_NOTIFICATION_TITLE: &str = "Notes";
const COPY_NOTIFICATION_BODY: &str = "Note copied to clipboard.";

/// Filters offered by the export prompt; only raw text is ever written.
pub const EXPORT_FILTERS: &[FileFilter] = &[
    FileFilter {
        name: "Markdown",
        extensions: &["md", "markdown"],
    },
    FileFilter {
        name: "Text",
        extensions: &["txt"],
    },
];

/// Per-deployment editor behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Close the editor surface after a successful save.
    pub close_on_save: bool,
    /// Copy rendered HTML to the clipboard when switching to rendered view.
    pub copy_rendered_html: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            close_on_save: false,
            copy_rendered_html: true,
        }
    }
}

/// Editor failure visible to the view layer.
#[derive(Debug)]
pub enum EditorError {
    NotFound(NoteId),
    Backend(NoteServiceError),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<NoteServiceError> for EditorError {
    fn from(value: NoteServiceError) -> Self {
        match value {
            NoteServiceError::NoteNotFound(id) => Self::NotFound(id),
            other => Self::Backend(other),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Raw,
    Rendered,
}

/// What the editor surface should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorView<'a> {
    Raw(&'a str),
    /// `stale` is set when the buffer changed after this HTML was rendered.
    Rendered { html: &'a str, stale: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    SavedAndClosed,
}

#[derive(Debug)]
pub enum CopyOutcome {
    /// Copied and a confirmation notification was shown.
    Notified,
    /// Copied; notification skipped because permission was refused.
    CopiedSilently,
    Failed(HostError),
}

#[derive(Debug)]
pub enum ExportOutcome {
    Written(PathBuf),
    Cancelled,
    Failed(HostError),
}

#[derive(Debug, Clone)]
struct RenderCache {
    source: String,
    html: String,
}

pub struct EditorController {
    service: NoteService,
    note_id: NoteId,
    buffer: String,
    saved_text: String,
    mode: RenderMode,
    rendered: Option<RenderCache>,
    options: EditorOptions,
}

impl EditorController {
    /// Loads `note_id` into a fresh buffer.
    ///
    /// # Errors
    /// - `EditorError::NotFound` when no such note exists.
    /// - `EditorError::Backend` when the load itself fails.
    pub fn open(
        service: NoteService,
        note_id: NoteId,
        options: EditorOptions,
    ) -> EditorResult<Self> {
        let note = service.load(note_id)?;
        let text = note.text().to_string();
        Ok(Self {
            service,
            note_id,
            buffer: text.clone(),
            saved_text: text,
            mode: RenderMode::Raw,
            rendered: None,
            options,
        })
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    /// Whether the buffer differs from the last loaded or saved text.
    pub fn is_dirty(&self) -> bool {
        self.buffer != self.saved_text
    }

    /// Replaces the buffer. Nothing is persisted.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Persists the buffer, then closes the surface if configured to.
    pub fn save(&mut self, host: &mut dyn WindowHost) -> EditorResult<SaveOutcome> {
        self.service.try_update(self.note_id, &self.buffer)?;
        self.saved_text = self.buffer.clone();
        if self.options.close_on_save {
            host.close_editor(self.note_id);
            return Ok(SaveOutcome::SavedAndClosed);
        }
        Ok(SaveOutcome::Saved)
    }

    /// Flips between raw and rendered display and returns the new mode.
    ///
    /// Switching to rendered re-renders when the cached HTML is not from
    /// the current buffer, and copies the HTML to the clipboard when
    /// `copy_rendered_html` is set. A clipboard failure is logged only.
    pub fn toggle_render(
        &mut self,
        renderer: &dyn MarkdownRenderer,
        clipboard: &mut dyn Clipboard,
    ) -> RenderMode {
        if self.mode == RenderMode::Rendered {
            self.mode = RenderMode::Raw;
            return self.mode;
        }

        let html = self.render_current(renderer).to_string();
        if self.options.copy_rendered_html {
            if let Err(err) = clipboard.write_text(&html) {
                warn!(
                    "event=editor_render_copy module=view status=error note_id={} error={err}",
                    self.note_id
                );
            }
        }
        self.mode = RenderMode::Rendered;
        self.mode
    }

    /// Current display content.
    pub fn view(&self) -> EditorView<'_> {
        match (self.mode, &self.rendered) {
            (RenderMode::Rendered, Some(cache)) => EditorView::Rendered {
                html: &cache.html,
                stale: cache.source != self.buffer,
            },
            _ => EditorView::Raw(&self.buffer),
        }
    }

    /// Copies the raw buffer and confirms with a notification when allowed.
    pub fn copy(
        &mut self,
        clipboard: &mut dyn Clipboard,
        notifications: &mut dyn NotificationCenter,
    ) -> CopyOutcome {
        if let Err(err) = clipboard.write_text(&self.buffer) {
            return CopyOutcome::Failed(err);
        }

        let mut permission = notifications.permission();
        if permission != NotificationPermission::Granted {
            permission = notifications.request_permission();
        }
        if permission != NotificationPermission::Granted {
            info!(
                "event=editor_copy module=view status=ok notified=false note_id={}",
                self.note_id
            );
            return CopyOutcome::CopiedSilently;
        }

        notifications.notify(COPY_NOTIFICATION_TITLE, COPY_NOTIFICATION_BODY);
        info!(
            "event=editor_copy module=view status=ok notified=true note_id={}",
            self.note_id
        );
        CopyOutcome::Notified
    }

    /// Prompts for a destination and writes the raw buffer there.
    ///
    /// Cancellation and failures are logged and reported, never raised.
    pub fn export_to_file(&mut self, dialog: &mut dyn SaveDialog) -> ExportOutcome {
        let path = match dialog.pick_save_path(EXPORT_FILTERS) {
            Ok(Some(path)) => path,
            Ok(None) => {
                info!(
                    "event=editor_export module=view status=cancelled note_id={}",
                    self.note_id
                );
                return ExportOutcome::Cancelled;
            }
            Err(err) => {
                warn!(
                    "event=editor_export module=view status=error stage=dialog note_id={} error={err}",
                    self.note_id
                );
                return ExportOutcome::Failed(err);
            }
        };

        match std::fs::write(&path, self.buffer.as_bytes()) {
            Ok(()) => {
                info!(
                    "event=editor_export module=view status=ok note_id={} bytes={}",
                    self.note_id,
                    self.buffer.len()
                );
                ExportOutcome::Written(path)
            }
            Err(err) => {
                warn!(
                    "event=editor_export module=view status=error stage=write note_id={} error={err}",
                    self.note_id
                );
                ExportOutcome::Failed(err.into())
            }
        }
    }

    fn render_current(&mut self, renderer: &dyn MarkdownRenderer) -> &str {
        let fresh = matches!(&self.rendered, Some(cache) if cache.source == self.buffer);
        if !fresh {
            self.rendered = Some(RenderCache {
                source: self.buffer.clone(),
                html: renderer.render(&self.buffer),
            });
        }
        self.rendered
            .as_ref()
            .map_or("", |cache| cache.html.as_str())
    }
}
