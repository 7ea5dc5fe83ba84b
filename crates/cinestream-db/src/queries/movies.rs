//! Movie catalogue queries.
//!
//! This module provides CRUD and search operations over the `movies` table.

use chrono::Utc;
use cinestream_common::{Error, MovieId, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp};
use crate::models::{Movie, MovieFields};

const MOVIE_COLUMNS: &str = "id, title, genre, rdate, runtime, description, trailer_url, \
                             filepath, imgpath, created_at";

fn row_to_movie(row: &Row) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: MovieId::from(row.get::<_, i64>(0)?),
        title: row.get(1)?,
        genre: row.get(2)?,
        rdate: row.get(3)?,
        runtime: row.get(4)?,
        description: row.get(5)?,
        trailer_url: row.get(6)?,
        filepath: row.get(7)?,
        imgpath: row.get(8)?,
        created_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}

/// Insert a movie record for freshly uploaded assets.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `fields` - Metadata supplied with the upload
/// * `filepath` - Stored path of the video asset
/// * `imgpath` - Stored path of the poster asset
///
/// # Returns
///
/// * `Ok(Movie)` - The created record, including its new id
/// * `Err(Error)` - If a database error occurs
pub fn create_movie(
    conn: &Connection,
    fields: &MovieFields,
    filepath: &str,
    imgpath: &str,
) -> Result<Movie> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO movies (title, genre, rdate, runtime, description, trailer_url,
                             filepath, imgpath, created_at)
         VALUES (:title, :genre, :rdate, :runtime, :description, :trailer_url,
                 :filepath, :imgpath, :created_at)",
        rusqlite::named_params! {
            ":title": fields.title,
            ":genre": fields.genre,
            ":rdate": fields.rdate,
            ":runtime": fields.runtime,
            ":description": fields.description,
            ":trailer_url": fields.trailer_url,
            ":filepath": filepath,
            ":imgpath": imgpath,
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(Error::database)?;

    get_movie(conn, MovieId::from(conn.last_insert_rowid()))?
        .ok_or_else(|| Error::Internal("inserted movie vanished".into()))
}

/// Get a movie by ID.
///
/// # Returns
///
/// * `Ok(Some(Movie))` - The movie if found
/// * `Ok(None)` - If the movie does not exist
/// * `Err(Error)` - If a database error occurs
pub fn get_movie(conn: &Connection, id: MovieId) -> Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = :id"),
        rusqlite::named_params! { ":id": id.get() },
        row_to_movie,
    )
    .optional()
    .map_err(Error::database)
}

/// Resolve the record a session binding is built from.
///
/// Same row as [`get_movie`]; kept as its own entry point because the
/// session selector and the catalogue evolve independently.
pub fn fetch_movie_info(conn: &Connection, id: MovieId) -> Result<Option<Movie>> {
    get_movie(conn, id)
}

/// List all movies, newest first.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id DESC"
        ))
        .map_err(Error::database)?;

    let movies = stmt
        .query_map([], row_to_movie)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(movies)
}

/// Movies whose title equals `title` exactly.
pub fn find_movies_by_title(conn: &Connection, title: &str) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title = :title ORDER BY id"
        ))
        .map_err(Error::database)?;

    let movies = stmt
        .query_map(rusqlite::named_params! { ":title": title }, row_to_movie)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(movies)
}

/// Search movies by substring of title and/or genre.
///
/// Absent or blank filters are ignored; with no filters every movie matches.
pub fn search_movies(
    conn: &Connection,
    title: Option<&str>,
    genre: Option<&str>,
) -> Result<Vec<Movie>> {
    let mut sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE 1=1");
    let mut params: Vec<String> = Vec::new();

    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        sql.push_str(" AND title LIKE ?");
        params.push(format!("%{}%", title.trim()));
    }
    if let Some(genre) = genre.filter(|g| !g.trim().is_empty()) {
        sql.push_str(" AND genre LIKE ?");
        params.push(format!("%{}%", genre.trim()));
    }
    sql.push_str(" ORDER BY title");

    let mut stmt = conn.prepare(&sql).map_err(Error::database)?;
    let movies = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), row_to_movie)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(movies)
}

/// Update the metadata of a movie. Asset paths are never changed here.
///
/// # Returns
///
/// * `Ok(true)` - If the movie was updated
/// * `Ok(false)` - If the movie did not exist
pub fn update_movie(conn: &Connection, id: MovieId, fields: &MovieFields) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE movies SET title = :title, genre = :genre, rdate = :rdate,
                    runtime = :runtime, description = :description, trailer_url = :trailer_url
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.get(),
                ":title": fields.title,
                ":genre": fields.genre,
                ":rdate": fields.rdate,
                ":runtime": fields.runtime,
                ":description": fields.description,
                ":trailer_url": fields.trailer_url,
            },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}

/// Delete a movie row. Asset files are the caller's responsibility.
///
/// # Returns
///
/// * `Ok(true)` - If the movie was deleted
/// * `Ok(false)` - If the movie did not exist
pub fn delete_movie(conn: &Connection, id: MovieId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM movies WHERE id = :id",
            rusqlite::named_params! { ":id": id.get() },
        )
        .map_err(Error::database)?;

    Ok(rows > 0)
}
