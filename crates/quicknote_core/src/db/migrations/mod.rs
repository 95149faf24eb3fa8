//! Schema registry for the embedded note store.
//!
//! # Invariants
//! - `version` values are strictly increasing from 1.
//! - Pending steps run inside one transaction; a failing step leaves the
//!   file at its previous version.
//! - Step 1 tolerates a `notes` table created before versioning existed.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

/// One schema step, identified by the `user_version` it produces.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "notes",
    sql: include_str!("0001_notes.sql"),
}];

/// Latest schema version this binary can produce.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the database file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the schema up to [`latest_version`] and returns the number of
/// steps applied.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file is newer than this
///   binary.
/// - `DbError::Sqlite` when a step fails; nothing is committed then.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<SchemaStep> = SCHEMA_STEPS
        .iter()
        .copied()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        run_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={found} to_version={latest} steps={}",
        pending.len()
    );
    Ok(pending.len())
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    // PRAGMA values cannot be bound as parameters.
    tx.pragma_update(None, "user_version", step.version)?;
    info!(
        "event=db_migrate_step module=db version={} name={}",
        step.version, step.name
    );
    Ok(())
}
