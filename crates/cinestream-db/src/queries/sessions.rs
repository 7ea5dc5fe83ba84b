//! Durable session records.
//!
//! Rows are keyed by the opaque session id carried in the cookie. Expired
//! rows are invisible to [`load_session`] and removed by
//! [`delete_expired_sessions`].

use chrono::{DateTime, Utc};
use cinestream_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp};
use crate::models::StoredSession;

/// Load a session that has not expired at `now`.
pub fn load_session(conn: &Connection, id: &str, now: DateTime<Utc>) -> Result<Option<StoredSession>> {
    conn.query_row(
        "SELECT id, data, expires_at FROM sessions
         WHERE id = :id AND expires_at > :now",
        rusqlite::named_params! { ":id": id, ":now": format_timestamp(now) },
        |row| {
            Ok(StoredSession {
                id: row.get(0)?,
                data: row.get(1)?,
                expires_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
            })
        },
    )
    .optional()
    .map_err(Error::database)
}

/// Insert or replace a session record.
pub fn save_session(conn: &Connection, session: &StoredSession) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, data, expires_at) VALUES (:id, :data, :expires_at)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at",
        rusqlite::named_params! {
            ":id": session.id,
            ":data": session.data,
            ":expires_at": format_timestamp(session.expires_at),
        },
    )
    .map_err(Error::database)?;

    Ok(())
}

/// Remove a session record. Returns whether a row existed.
pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM sessions WHERE id = :id",
            rusqlite::named_params! { ":id": id },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}

/// Remove every session that expired at or before `now`.
pub fn delete_expired_sessions(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= :now",
        rusqlite::named_params! { ":now": format_timestamp(now) },
    )
    .map_err(Error::database)
}
