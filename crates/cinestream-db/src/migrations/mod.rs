//! Embedded schema migrations.
//!
//! Schema steps are SQL files compiled into the binary. The step at index
//! `i` brings the database to version `i + 1`; the applied version lives in
//! SQLite's `user_version` header field, so it commits atomically with the
//! step that set it.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {version} ({name}) failed: {source}")]
    Step {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },

    #[error("Database schema version {found} is newer than this build supports ({known})")]
    UnknownVersion { found: u32, known: u32 },
}

/// Ordered schema steps as `(name, sql)`.
const STEPS: &[(&str, &str)] = &[
    ("initial", include_str!("001_initial.sql")),
    ("sessions", include_str!("002_sessions.sql")),
];

/// Schema version a fully migrated database reports.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Schema version recorded in the database. A fresh database reports 0.
pub fn current_version(conn: &Connection) -> Result<u32, MigrationError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the schema up to [`latest_version`], one transaction per step.
///
/// Returns how many steps ran. A database written by a newer build is
/// rejected rather than touched.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    conn.pragma_update(None, "foreign_keys", true)?;

    let found = current_version(conn)?;
    let known = latest_version();
    if found > known {
        return Err(MigrationError::UnknownVersion { found, known });
    }

    let pending = STEPS.iter().zip(1u32..).skip(found as usize);
    let mut applied = 0;
    for (&(name, sql), version) in pending {
        let step_failed = |source: rusqlite::Error| MigrationError::Step {
            version,
            name,
            source,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql).map_err(step_failed)?;
        tx.pragma_update(None, "user_version", version)
            .map_err(step_failed)?;
        tx.commit().map_err(step_failed)?;

        tracing::info!(version, name, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}
