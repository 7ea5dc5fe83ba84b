//! Comment queries for forum threads.

use chrono::Utc;
use cinestream_common::{CommentId, Error, ForumId, Result, UserId};
use rusqlite::{Connection, Row};

use super::{format_timestamp, parse_timestamp};
use crate::models::Comment;

fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: CommentId::from(row.get::<_, i64>(0)?),
        forum_id: ForumId::from(row.get::<_, i64>(1)?),
        user_id: UserId::from(row.get::<_, i64>(2)?),
        content: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

/// Add a comment to a thread.
///
/// Fails with [`Error::NotFound`] when the thread does not exist.
pub fn create_comment(
    conn: &Connection,
    forum_id: ForumId,
    user_id: UserId,
    content: &str,
) -> Result<Comment> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO comments (forum_id, user_id, content, created_at)
         VALUES (:forum_id, :user_id, :content, :created_at)",
        rusqlite::named_params! {
            ":forum_id": forum_id.get(),
            ":user_id": user_id.get(),
            ":content": content,
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(|e| {
        if e.to_string().contains("FOREIGN KEY constraint failed") {
            Error::not_found("forum", forum_id)
        } else {
            Error::database(e)
        }
    })?;

    Ok(Comment {
        id: CommentId::from(conn.last_insert_rowid()),
        forum_id,
        user_id,
        content: content.to_string(),
        created_at,
    })
}

/// Comments on a thread in posting order.
pub fn list_comments_for_forum(conn: &Connection, forum_id: ForumId) -> Result<Vec<Comment>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, forum_id, user_id, content, created_at FROM comments
             WHERE forum_id = :forum_id ORDER BY id",
        )
        .map_err(Error::database)?;

    let comments = stmt
        .query_map(
            rusqlite::named_params! { ":forum_id": forum_id.get() },
            row_to_comment,
        )
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(comments)
}

/// Delete a comment if `owner` wrote it.
pub fn delete_comment(conn: &Connection, id: CommentId, owner: UserId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM comments WHERE id = :id AND user_id = :user_id",
            rusqlite::named_params! { ":id": id.get(), ":user_id": owner.get() },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}
