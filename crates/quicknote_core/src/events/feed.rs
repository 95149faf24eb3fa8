//! Hosted backend change feed.
//!
//! # Responsibility
//! - Build the realtime join/heartbeat frames for the notes table.
//! - Decode pushed frames into `RowUpdate`s and queue them for listeners.
//!
//! # Invariants
//! - Only `UPDATE` changes on the configured table are delivered.
//! - Delivery is unordered and at-least-once; consumers merge with
//!   last-write-wins and no version check.
//!
//! The socket transport that carries frames is owned by the host; it feeds
//! raw text frames into [`RemoteChangeFeed::ingest_frame`].

use crate::model::note::{Note, NoteId};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{channel, Receiver, Sender};

const CHANGES_EVENT: &str = "postgres_changes";
const UPDATE_KIND: &str = "UPDATE";
const DEFAULT_SCHEMA: &str = "public";

/// One pushed row update with old and new row images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    /// Row identity, taken from the old image when present.
    pub note_id: NoteId,
    /// Old image; often only the primary key.
    pub old: Option<Note>,
    pub new: Note,
}

impl RowUpdate {
    /// New text carried by the update.
    pub fn new_text(&self) -> Option<&str> {
        self.new.note_text.as_deref()
    }
}

/// Frame decoding error.
#[derive(Debug)]
pub enum FeedError {
    Malformed(serde_json::Error),
    MissingRecord,
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed change feed frame: {err}"),
            Self::MissingRecord => write!(f, "update frame carries no new record"),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::MissingRecord => None,
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

/// What happened to one ingested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Delivered,
    /// Heartbeats, join replies and changes this feed does not track.
    Ignored,
    Malformed,
    /// The receiving side was dropped.
    Disconnected,
}

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    data: ChangeData,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    table: String,
    #[serde(rename = "type", alias = "eventType")]
    kind: String,
    #[serde(default)]
    record: Option<Note>,
    #[serde(default)]
    old_record: Option<Note>,
}

/// Decodes one raw frame. `Ok(None)` means "not an update for `table`".
pub fn decode_update(frame: &str, table: &str) -> Result<Option<RowUpdate>, FeedError> {
    let frame: Frame = serde_json::from_str(frame)?;
    if frame.event != CHANGES_EVENT {
        return Ok(None);
    }

    let change: ChangePayload = serde_json::from_value(frame.payload)?;
    let data = change.data;
    if data.table != table || !data.kind.eq_ignore_ascii_case(UPDATE_KIND) {
        return Ok(None);
    }

    let new = data.record.ok_or(FeedError::MissingRecord)?;
    let note_id = data
        .old_record
        .as_ref()
        .map_or(new.note_id, |old| old.note_id);
    Ok(Some(RowUpdate {
        note_id,
        old: data.old_record,
        new,
    }))
}

/// Realtime subscription to `UPDATE` events on one table.
pub struct RemoteChangeFeed {
    table: String,
    tx: Sender<RowUpdate>,
}

impl RemoteChangeFeed {
    /// Creates a feed and the receiver its updates are queued on.
    pub fn new(table: impl Into<String>) -> (Self, Receiver<RowUpdate>) {
        let (tx, rx) = channel();
        (
            Self {
                table: table.into(),
                tx,
            },
            rx,
        )
    }

    /// Frame that subscribes `topic` to updates on this feed's table.
    pub fn join_message(&self, topic: &str, msg_ref: u64, access_token: Option<&str>) -> String {
        let mut payload = json!({
            "config": {
                "postgres_changes": [
                    { "event": UPDATE_KIND, "schema": DEFAULT_SCHEMA, "table": self.table }
                ]
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        json!({
            "topic": format!("realtime:{topic}"),
            "event": "phx_join",
            "payload": payload,
            "ref": msg_ref.to_string(),
        })
        .to_string()
    }

    /// Keep-alive frame the transport must send periodically.
    pub fn heartbeat_message(msg_ref: u64) -> String {
        json!({
            "topic": "phoenix",
            "event": "heartbeat",
            "payload": {},
            "ref": msg_ref.to_string(),
        })
        .to_string()
    }

    /// Decodes `frame` and queues it when it is a tracked update.
    pub fn ingest_frame(&self, frame: &str) -> FrameOutcome {
        match decode_update(frame, &self.table) {
            Ok(Some(update)) => {
                let note_id = update.note_id;
                if self.tx.send(update).is_err() {
                    return FrameOutcome::Disconnected;
                }
                debug!("event=feed_update module=events table={} note_id={note_id}", self.table);
                FrameOutcome::Delivered
            }
            Ok(None) => FrameOutcome::Ignored,
            Err(err) => {
                warn!(
                    "event=feed_update module=events status=error table={} error={err}",
                    self.table
                );
                FrameOutcome::Malformed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_update, FeedError, RemoteChangeFeed};
    use serde_json::Value;

    #[test]
    fn join_message_targets_update_events_on_table() {
        let (feed, _rx) = RemoteChangeFeed::new("notes");
        let frame: Value =
            serde_json::from_str(&feed.join_message("custom-update-channel", 1, Some("jwt")))
                .unwrap();
        assert_eq!(frame["topic"], "realtime:custom-update-channel");
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["ref"], "1");
        assert_eq!(frame["payload"]["access_token"], "jwt");
        let change = &frame["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "UPDATE");
        assert_eq!(change["table"], "notes");
    }

    #[test]
    fn update_without_new_record_is_an_error() {
        let frame = r#"{"event":"postgres_changes","payload":{"data":{"table":"notes","type":"UPDATE"}}}"#;
        assert!(matches!(
            decode_update(frame, "notes"),
            Err(FeedError::MissingRecord)
        ));
    }

    #[test]
    fn heartbeat_replies_are_not_updates() {
        let frame = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok"},"ref":"2"}"#;
        assert!(decode_update(frame, "notes").unwrap().is_none());
    }
}
