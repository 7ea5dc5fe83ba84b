//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - movies: Movie catalogue CRUD and search
//! - users: User accounts and credentials lookup
//! - forums: Forum threads
//! - comments: Comments on forum threads
//! - messages: Direct messages between users
//! - sessions: Durable HTTP session records

pub mod comments;
pub mod forums;
pub mod messages;
pub mod movies;
pub mod sessions;
pub mod users;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp the way every table stores it.
///
/// Fixed precision keeps lexicographic comparison in SQL consistent with
/// chronological order.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp, reporting failures as a column
/// conversion error.
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
