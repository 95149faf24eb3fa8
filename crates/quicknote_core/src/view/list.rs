//! Note list controller.
//!
//! # Responsibility
//! - Mirror the notes matching the current search input.
//! - Dispatch add/remove/open commands and react to change notifications.
//! - Track which notes have an editor surface open.
//!
//! # Invariants
//! - Only the newest issued query may replace the mirror; older ones are
//!   discarded when they complete.
//! - A failed query leaves an empty list plus an explicit `last_error`.
//! - Remote row updates replace `note_text` only, last-write-wins.
//! - `open` is idempotent per note until the host reports the surface closed.

use crate::events::bus::Subscription;
use crate::events::feed::RowUpdate;
use crate::host::WindowHost;
use crate::model::note::{Note, NoteId};
use crate::service::note_service::{derive_preview, NoteService, NoteServiceError, ServiceResult};
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;

/// Query lifecycle of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Idle,
    Loading,
}

/// Handle for one issued search; only the newest one is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    seq: u64,
    pattern: String,
}

impl QueryTicket {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Display row for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub note_id: NoteId,
    pub preview: String,
    pub is_open: bool,
}

/// Summary of one [`ListController::pump_events`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub bus_events: usize,
    pub remote_updates: usize,
    pub reloaded: bool,
}

pub struct ListController {
    service: NoteService,
    subscription: Subscription,
    remote_updates: Option<Receiver<RowUpdate>>,
    notes: Vec<Note>,
    search_input: String,
    state: ListState,
    last_error: Option<NoteServiceError>,
    open_windows: BTreeSet<NoteId>,
    issued_seq: u64,
}

impl ListController {
    /// Creates an unmounted controller subscribed to the service's bus.
    pub fn new(service: NoteService) -> Self {
        let subscription = service.bus().subscribe();
        Self {
            service,
            subscription,
            remote_updates: None,
            notes: Vec::new(),
            search_input: String::new(),
            state: ListState::Idle,
            last_error: None,
            open_windows: BTreeSet::new(),
            issued_seq: 0,
        }
    }

    /// Attaches the receiver of a hosted backend change feed.
    pub fn with_remote_updates(mut self, updates: Receiver<RowUpdate>) -> Self {
        self.remote_updates = Some(updates);
        self
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Error of the last query or command, cleared by the next success.
    pub fn last_error(&self) -> Option<&NoteServiceError> {
        self.last_error.as_ref()
    }

    pub fn open_windows(&self) -> &BTreeSet<NoteId> {
        &self.open_windows
    }

    pub fn is_open(&self, note_id: NoteId) -> bool {
        self.open_windows.contains(&note_id)
    }

    /// Display rows in list order.
    pub fn rows(&self) -> Vec<ListRow> {
        self.notes
            .iter()
            .map(|note| ListRow {
                note_id: note.note_id,
                preview: derive_preview(note.text()),
                is_open: self.is_open(note.note_id),
            })
            .collect()
    }

    /// Initial load with an empty search.
    pub fn mount(&mut self) {
        self.search_input.clear();
        self.reload();
    }

    /// Re-queries on every input change; no debounce.
    pub fn on_search_input(&mut self, input: &str) {
        self.search_input = input.to_string();
        self.reload();
    }

    /// Re-runs the query for the current search input.
    pub fn reload(&mut self) {
        let ticket = self.begin_query(self.search_input.clone());
        let result = self.service.try_search(ticket.pattern());
        self.finish_query(ticket, result);
    }

    /// Enters `Loading` and issues a ticket superseding all earlier ones.
    ///
    /// Bus events pending at this point are already reflected by the
    /// query about to run and are dropped.
    pub fn begin_query(&mut self, pattern: impl Into<String>) -> QueryTicket {
        self.subscription.drain();
        self.issued_seq += 1;
        self.state = ListState::Loading;
        QueryTicket {
            seq: self.issued_seq,
            pattern: pattern.into(),
        }
    }

    /// Applies a completed query. Returns `false` when the ticket was
    /// superseded and the result discarded.
    pub fn finish_query(&mut self, ticket: QueryTicket, result: ServiceResult<Vec<Note>>) -> bool {
        if ticket.seq != self.issued_seq {
            debug!(
                "event=list_query module=view status=stale seq={} latest={}",
                ticket.seq, self.issued_seq
            );
            return false;
        }

        match result {
            Ok(notes) => {
                self.notes = notes;
                self.last_error = None;
            }
            Err(err) => {
                self.notes.clear();
                self.last_error = Some(err);
            }
        }
        self.state = ListState::Idle;
        true
    }

    /// Creates an empty note, then reloads regardless of the outcome.
    pub fn add(&mut self) -> Option<Note> {
        let created = self.service.try_create();
        let note = match created {
            Ok(note) => Some(note),
            Err(err) => {
                self.last_error = Some(err);
                None
            }
        };
        self.reload_keeping_error(note.is_none());
        note
    }

    /// Deletes a note, then reloads regardless of the outcome.
    pub fn remove(&mut self, note_id: NoteId) {
        let failed = match self.service.try_remove(note_id) {
            Ok(()) | Err(NoteServiceError::NoteNotFound(_)) => false,
            Err(err) => {
                self.last_error = Some(err);
                true
            }
        };
        self.reload_keeping_error(failed);
    }

    /// Asks the host to open an editor for `note_id` unless one is open.
    ///
    /// Returns `true` when a new surface was requested.
    pub fn open(&mut self, note_id: NoteId, host: &mut dyn WindowHost) -> bool {
        if !self.open_windows.insert(note_id) {
            return false;
        }
        info!("event=editor_open module=view note_id={note_id}");
        host.open_editor(note_id);
        true
    }

    /// Host report that the editor surface for `note_id` closed.
    pub fn on_window_closed(&mut self, note_id: NoteId) -> bool {
        self.open_windows.remove(&note_id)
    }

    /// Drains pending notifications.
    ///
    /// Any number of bus events coalesce into one reload. Remote row
    /// updates are merged in arrival order without a reload.
    pub fn pump_events(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        let updates: Vec<RowUpdate> = match &self.remote_updates {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        for update in &updates {
            self.apply_remote_update(update);
        }
        report.remote_updates = updates.len();

        report.bus_events = self.subscription.drain().len();
        if report.bus_events > 0 {
            self.reload();
            report.reloaded = true;
        }
        report
    }

    /// Merges the new `note_text` of a pushed update into the mirror.
    ///
    /// Returns `false` when the note is not in the current list. No
    /// version check: a stale push overwrites newer local text.
    pub fn apply_remote_update(&mut self, update: &RowUpdate) -> bool {
        match self.notes.iter_mut().find(|note| note.note_id == update.note_id) {
            Some(note) => {
                note.note_text = update.new.note_text.clone();
                true
            }
            None => false,
        }
    }

    fn reload_keeping_error(&mut self, keep: bool) {
        let pending = if keep { self.last_error.take() } else { None };
        self.reload();
        if pending.is_some() {
            self.last_error = pending;
        }
    }
}
