//! Embedded SQLite note repository.
//!
//! # Responsibility
//! - Run parameterized CRUD statements against the local `notes` table.
//! - Decode rows into `Note` records, rejecting malformed ids.
//!
//! # Invariants
//! - Search binds the user pattern through `LIKE ? ESCAPE '\'`; ASCII case
//!   is ignored, as SQLite's `LIKE` does by default.
//! - Results come back in insertion (`rowid`) order.

use crate::db::{open_db, open_db_in_memory};
use crate::model::note::{Note, NoteId};
use crate::repo::{NoteRepository, RepoError, RepoResult};
use crate::search::pattern::sqlite_like_pattern;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT note_id, note_text, user_id FROM notes";
const REQUIRED_COLUMNS: [&str; 3] = ["note_id", "note_text", "user_id"];

/// SQLite-backed note repository owning its connection.
pub struct SqliteNoteRepository {
    conn: Mutex<Connection>,
}

impl SqliteNoteRepository {
    /// Wraps a migrated connection after checking the `notes` table shape.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens and migrates the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::Unavailable("sqlite connection lock poisoned"))
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn search_notes(&self, pattern: &str) -> RepoResult<Vec<Note>> {
        let conn = self.conn()?;
        let mut notes = Vec::new();

        match sqlite_like_pattern(pattern) {
            Some(like) => {
                let mut stmt = conn.prepare(&format!(
                    "{NOTE_SELECT_SQL} WHERE note_text LIKE ?1 ESCAPE '\\' ORDER BY rowid ASC;"
                ))?;
                let mut rows = stmt.query([like.as_str()])?;
                while let Some(row) = rows.next()? {
                    notes.push(parse_note_row(row)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} ORDER BY rowid ASC;"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    notes.push(parse_note_row(row)?);
                }
            }
        }

        Ok(notes)
    }

    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE note_id = ?1;"))?;
        let mut rows = stmt.query([note_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn create_note(&self, note: &Note) -> RepoResult<Note> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notes (note_id, note_text, user_id) VALUES (?1, ?2, ?3);",
            params![
                note.note_id.to_string(),
                note.note_text.as_deref(),
                note.user_id.as_deref(),
            ],
        )?;

        let stored = conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE note_id = ?1;"),
                [note.note_id.to_string()],
                |row| Ok(parse_note_row(row)),
            )
            .optional()?;
        match stored {
            Some(parsed) => parsed,
            None => Err(RepoError::InvalidData(format!(
                "inserted note {} missing on read-back",
                note.note_id
            ))),
        }
    }

    fn update_note_text(&self, note_id: NoteId, text: &str) -> RepoResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE notes SET note_text = ?2 WHERE note_id = ?1;",
            params![note_id.to_string(), text],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(note_id));
        }
        Ok(())
    }

    fn remove_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM notes WHERE note_id = ?1;", [note_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(note_id));
        }
        Ok(())
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("note_id")?;
    let note_id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in notes.note_id"))
    })?;
    Ok(Note {
        note_id,
        note_text: row.get("note_text")?,
        user_id: row.get("user_id")?,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(notes);")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }

    if present.is_empty() {
        return Err(RepoError::InvalidData(
            "required table `notes` is missing; was the connection migrated?".to_string(),
        ));
    }
    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::InvalidData(format!(
                "required column `notes.{column}` is missing"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteNoteRepository;
    use crate::model::note::Note;
    use crate::repo::{NoteRepository, RepoError};
    use rusqlite::Connection;
    use uuid::Uuid;

    #[test]
    fn unmigrated_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteNoteRepository::try_new(conn).err().unwrap();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn like_wildcards_in_input_match_literally() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let discount = Note::with_text(Uuid::new_v4(), "50% off");
        let plain = Note::with_text(Uuid::new_v4(), "500 off");
        repo.create_note(&discount).unwrap();
        repo.create_note(&plain).unwrap();

        let hits = repo.search_notes("0%").unwrap();
        assert_eq!(hits, vec![discount]);
        let underscore = repo.search_notes("_").unwrap();
        assert!(underscore.is_empty());
    }

    #[test]
    fn null_text_rows_are_listed_but_never_matched() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let note = Note {
            note_id: Uuid::new_v4(),
            note_text: None,
            user_id: None,
        };
        repo.create_note(&note).unwrap();

        assert_eq!(repo.search_notes("").unwrap(), vec![note]);
        assert!(repo.search_notes("x").unwrap().is_empty());
    }

    #[test]
    fn writes_against_missing_rows_report_not_found() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(
            repo.update_note_text(missing, "x"),
            Err(RepoError::NotFound(id)) if id == missing
        ));
        assert!(matches!(
            repo.remove_note(missing),
            Err(RepoError::NotFound(_))
        ));
    }
}
