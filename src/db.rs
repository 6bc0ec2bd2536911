// src/db.rs

//! Database schema definitions and migrations for Graft
//!
//! This module defines the SQLite schema for the content database and
//! provides a migration system to evolve the schema over time, plus the
//! journal that records recipe runs.

use crate::error::Result;
use crate::recipe::{RunJournal, StepOutcome};
use rusqlite::{Connection, params};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Open the content database, applying pending migrations.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    Ok(conn)
}

/// Create the content database, including parent directories.
pub fn init(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let conn = open(path)?;
    info!("Initialized content database at {}", path.display());
    Ok(conn)
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        debug!("Schema is up to date");
        return Ok(());
    }

    // Apply migrations in order
    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!(
        "Schema migration complete. Now at version {}",
        SCHEMA_VERSION
    );
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => panic!("Unknown migration version: {}", version),
    }
}

/// Initial schema - Version 1
///
/// Creates the core tables for Graft:
/// - content_items: One row per content identity with infoset documents
/// - import_runs: Journal of recipe step outcomes per run
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Content items: identity-addressed units with XML infoset documents
        CREATE TABLE content_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identity TEXT NOT NULL UNIQUE,
            content_type TEXT NOT NULL,
            data TEXT NOT NULL,
            version_data TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            modified_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_content_items_type ON content_items(content_type);

        -- Import runs: one row per step outcome within a recipe run
        CREATE TABLE import_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            step_name TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('executed', 'skipped', 'failed')),
            detail TEXT,
            recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_import_runs_run_id ON import_runs(run_id);
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// One journal row, as read back by the history listing.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub step_name: String,
    pub status: String,
    pub detail: Option<String>,
    pub recorded_at: String,
}

impl RunRecord {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(RunRecord {
            run_id: row.get(0)?,
            step_name: row.get(1)?,
            status: row.get(2)?,
            detail: row.get(3)?,
            recorded_at: row.get(4)?,
        })
    }
}

/// Most recent journal rows, newest first.
pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, step_name, status, detail, recorded_at
         FROM import_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], RunRecord::from_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Journal backed by the import_runs table.
///
/// Recording is best-effort: a journal write failure is logged and never
/// aborts the run it describes.
pub struct SqliteRunJournal {
    conn: Rc<Connection>,
}

impl SqliteRunJournal {
    pub fn new(conn: Rc<Connection>) -> Self {
        SqliteRunJournal { conn }
    }
}

impl RunJournal for SqliteRunJournal {
    fn record(&mut self, run_id: &str, outcome: &StepOutcome) {
        let result = self.conn.execute(
            "INSERT INTO import_runs (run_id, step_name, status, detail)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                outcome.step_name,
                outcome.status.as_str(),
                outcome.detail
            ],
        );
        if let Err(e) = result {
            warn!("Failed to record step outcome for run {}: {}", run_id, e);
        }
    }
}
