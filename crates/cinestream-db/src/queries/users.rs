//! User database queries.
//!
//! This module provides CRUD operations for user accounts.

use chrono::Utc;
use cinestream_common::{Error, Result, UserId};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp};
use crate::models::User;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, created_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::from(row.get::<_, i64>(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

fn map_unique_email(e: rusqlite::Error, email: &str) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("Email '{}' is already registered", email))
    } else {
        Error::database(e)
    }
}

/// Create a new user.
///
/// Emails are stored lowercased and must be unique.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `first_name` - Given name
/// * `last_name` - Family name
/// * `email` - Login email
/// * `password_hash` - bcrypt hash of the password
///
/// # Returns
///
/// * `Ok(User)` - The created user
/// * `Err(Error)` - If the email already exists or a database error occurs
pub fn create_user(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let email = email.trim().to_lowercase();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO users (first_name, last_name, email, password_hash, created_at)
         VALUES (:first_name, :last_name, :email, :password_hash, :created_at)",
        rusqlite::named_params! {
            ":first_name": first_name,
            ":last_name": last_name,
            ":email": email,
            ":password_hash": password_hash,
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(|e| map_unique_email(e, &email))?;

    get_user(conn, UserId::from(conn.last_insert_rowid()))?
        .ok_or_else(|| Error::Internal("inserted user vanished".into()))
}

/// Get a user by ID.
///
/// # Returns
///
/// * `Ok(Some(User))` - The user if found
/// * `Ok(None)` - If the user does not exist
/// * `Err(Error)` - If a database error occurs
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = :id"),
        rusqlite::named_params! { ":id": id.get() },
        row_to_user,
    )
    .optional()
    .map_err(Error::database)
}

/// Get a user by email (case-insensitive).
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = :email"),
        rusqlite::named_params! { ":email": email.trim().to_lowercase() },
        row_to_user,
    )
    .optional()
    .map_err(Error::database)
}

/// List all users ordered by id.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .map_err(Error::database)?;

    let users = stmt
        .query_map([], row_to_user)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(users)
}

/// Find users whose first or last name contains `name`.
pub fn search_users_by_name(conn: &Connection, name: &str) -> Result<Vec<User>> {
    let pattern = format!("%{}%", name.trim());
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE first_name LIKE :pattern OR last_name LIKE :pattern
             ORDER BY last_name, first_name"
        ))
        .map_err(Error::database)?;

    let users = stmt
        .query_map(rusqlite::named_params! { ":pattern": pattern }, row_to_user)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(users)
}

/// Update a user's profile fields.
///
/// # Returns
///
/// * `Ok(true)` - If the user was updated
/// * `Ok(false)` - If the user did not exist
/// * `Err(Error)` - If the new email is taken or a database error occurs
pub fn update_user(
    conn: &Connection,
    id: UserId,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<bool> {
    let email = email.trim().to_lowercase();
    let rows = conn
        .execute(
            "UPDATE users SET first_name = :first_name, last_name = :last_name, email = :email
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.get(),
                ":first_name": first_name,
                ":last_name": last_name,
                ":email": email,
            },
        )
        .map_err(|e| map_unique_email(e, &email))?;

    Ok(rows > 0)
}

/// Replace a user's password hash.
pub fn update_password(conn: &Connection, id: UserId, password_hash: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE users SET password_hash = :password_hash WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.get(),
                ":password_hash": password_hash,
            },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}

/// Delete a user. Their forum threads go with them.
pub fn delete_user(conn: &Connection, id: UserId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM users WHERE id = :id",
            rusqlite::named_params! { ":id": id.get() },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn create_and_lookup_user() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let user = create_user(&conn, "Ada", "Lovelace", "Ada@Example.com", "hash").unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.password_hash, "hash");

        let by_id = get_user(&conn, user.id).unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_email = get_user_by_email(&conn, "ADA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        create_user(&conn, "Ada", "Lovelace", "ada@example.com", "h").unwrap();
        let err = create_user(&conn, "Other", "Person", "ada@example.com", "h").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn search_matches_first_or_last_name() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        create_user(&conn, "Ada", "Lovelace", "ada@example.com", "h").unwrap();
        create_user(&conn, "Alan", "Turing", "alan@example.com", "h").unwrap();
        create_user(&conn, "Grace", "Hopper", "grace@example.com", "h").unwrap();

        assert_eq!(search_users_by_name(&conn, "a").unwrap().len(), 3);
        let hits = search_users_by_name(&conn, "tur").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].first_name, "Alan");
    }

    #[test]
    fn update_and_delete_user() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = create_user(&conn, "Ada", "Lovelace", "ada@example.com", "h").unwrap();

        assert!(update_user(&conn, user.id, "Augusta", "King", "augusta@example.com").unwrap());
        let updated = get_user(&conn, user.id).unwrap().unwrap();
        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.email, "augusta@example.com");

        assert!(update_password(&conn, user.id, "new-hash").unwrap());
        assert_eq!(get_user(&conn, user.id).unwrap().unwrap().password_hash, "new-hash");

        assert!(delete_user(&conn, user.id).unwrap());
        assert!(get_user(&conn, user.id).unwrap().is_none());
        assert!(!delete_user(&conn, user.id).unwrap());
        assert!(list_users(&conn).unwrap().is_empty());
    }
}
