//! Direct message queries.

use chrono::Utc;
use cinestream_common::{Error, MessageId, Result, UserId};
use rusqlite::{Connection, Row};

use super::{format_timestamp, parse_timestamp};
use crate::models::Message;

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId::from(row.get::<_, i64>(0)?),
        from_user_id: UserId::from(row.get::<_, i64>(1)?),
        to_user_id: UserId::from(row.get::<_, i64>(2)?),
        message: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

/// Store a message from one user to another.
///
/// Fails with [`Error::NotFound`] when the recipient does not exist.
pub fn send_message(conn: &Connection, from: UserId, to: UserId, message: &str) -> Result<Message> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO messages (from_user_id, to_user_id, message, created_at)
         VALUES (:from, :to, :message, :created_at)",
        rusqlite::named_params! {
            ":from": from.get(),
            ":to": to.get(),
            ":message": message,
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(|e| {
        if e.to_string().contains("FOREIGN KEY constraint failed") {
            Error::not_found("user", to)
        } else {
            Error::database(e)
        }
    })?;

    Ok(Message {
        id: MessageId::from(conn.last_insert_rowid()),
        from_user_id: from,
        to_user_id: to,
        message: message.to_string(),
        created_at,
    })
}

fn messages_where(conn: &Connection, column: &str, user_id: UserId) -> Result<Vec<Message>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, from_user_id, to_user_id, message, created_at FROM messages
             WHERE {column} = :user_id ORDER BY id"
        ))
        .map_err(Error::database)?;

    let messages = stmt
        .query_map(
            rusqlite::named_params! { ":user_id": user_id.get() },
            row_to_message,
        )
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(messages)
}

/// Messages addressed to `user_id`, oldest first.
pub fn received_messages(conn: &Connection, user_id: UserId) -> Result<Vec<Message>> {
    messages_where(conn, "to_user_id", user_id)
}

/// Messages written by `user_id`, oldest first.
pub fn sent_messages(conn: &Connection, user_id: UserId) -> Result<Vec<Message>> {
    messages_where(conn, "from_user_id", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use crate::queries::users::create_user;

    #[test]
    fn received_and_sent_are_split() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ada = create_user(&conn, "Ada", "Lovelace", "ada@example.com", "h").unwrap();
        let alan = create_user(&conn, "Alan", "Turing", "alan@example.com", "h").unwrap();

        send_message(&conn, ada.id, alan.id, "hi Alan").unwrap();
        send_message(&conn, alan.id, ada.id, "hi Ada").unwrap();
        send_message(&conn, ada.id, alan.id, "seen Heat?").unwrap();

        let inbox = received_messages(&conn, alan.id).unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[1].message, "seen Heat?");

        let outbox = sent_messages(&conn, alan.id).unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to_user_id, ada.id);
    }

    #[test]
    fn message_to_unknown_user_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ada = create_user(&conn, "Ada", "Lovelace", "ada@example.com", "h").unwrap();

        let err = send_message(&conn, ada.id, UserId::from(999), "anyone?").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
