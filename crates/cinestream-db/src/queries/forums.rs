//! Forum thread queries.

use chrono::Utc;
use cinestream_common::{Error, ForumId, Result, UserId};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp};
use crate::models::Forum;

fn row_to_forum(row: &Row) -> rusqlite::Result<Forum> {
    Ok(Forum {
        id: ForumId::from(row.get::<_, i64>(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        user_id: UserId::from(row.get::<_, i64>(3)?),
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

/// Open a new thread owned by `user_id`.
pub fn create_forum(conn: &Connection, user_id: UserId, title: &str, content: &str) -> Result<Forum> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO forums (title, content, user_id, created_at)
         VALUES (:title, :content, :user_id, :created_at)",
        rusqlite::named_params! {
            ":title": title,
            ":content": content,
            ":user_id": user_id.get(),
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(Error::database)?;

    Ok(Forum {
        id: ForumId::from(conn.last_insert_rowid()),
        title: title.to_string(),
        content: content.to_string(),
        user_id,
        created_at,
    })
}

/// Get a thread by ID.
pub fn get_forum(conn: &Connection, id: ForumId) -> Result<Option<Forum>> {
    conn.query_row(
        "SELECT id, title, content, user_id, created_at FROM forums WHERE id = :id",
        rusqlite::named_params! { ":id": id.get() },
        row_to_forum,
    )
    .optional()
    .map_err(Error::database)
}

/// List all threads, newest first.
pub fn list_forums(conn: &Connection) -> Result<Vec<Forum>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, content, user_id, created_at FROM forums
             ORDER BY created_at DESC, id DESC",
        )
        .map_err(Error::database)?;

    let forums = stmt
        .query_map([], row_to_forum)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(forums)
}

/// Delete a thread if `owner` created it. Its comments are removed with it.
///
/// # Returns
///
/// * `Ok(true)` - If the thread was deleted
/// * `Ok(false)` - If no thread with this id belongs to `owner`
pub fn delete_forum(conn: &Connection, id: ForumId, owner: UserId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM forums WHERE id = :id AND user_id = :user_id",
            rusqlite::named_params! { ":id": id.get(), ":user_id": owner.get() },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}
