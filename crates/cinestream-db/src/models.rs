//! Internal Rust models matching the database schema.
//!
//! This module provides strongly-typed Rust structures that map to database tables.
//! Field names serialize the way the web client expects them (`filepath`,
//! `imgpath`, `fName`, ...).

use chrono::{DateTime, Utc};
use cinestream_common::{CommentId, ForumId, MessageId, MovieId, UserId};
use serde::{Deserialize, Serialize};

/// Movie record: metadata plus the paths of its two uploaded assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genre: String,
    pub rdate: String,
    pub runtime: String,
    pub description: String,
    pub trailer_url: Option<String>,
    /// Path of the video asset, persisted verbatim from upload.
    pub filepath: String,
    /// Path of the poster asset, persisted verbatim from upload.
    pub imgpath: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata fields supplied on ingest and on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieFields {
    pub title: String,
    pub genre: String,
    pub rdate: String,
    pub runtime: String,
    pub description: String,
    pub trailer_url: Option<String>,
}

impl MovieFields {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("genre", &self.genre),
            ("rdate", &self.rdate),
            ("runtime", &self.runtime),
            ("description", &self.description),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// User account model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "fName")]
    pub first_name: String,
    #[serde(rename = "lName")]
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Forum thread model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forum {
    pub id: ForumId,
    pub title: String,
    pub content: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Comment on a forum thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub forum_id: ForumId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Serialized session state with its expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub id: String,
    pub data: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_fields_reports_blank_fields() {
        let fields = MovieFields {
            title: "Alien".into(),
            genre: " ".into(),
            rdate: "1979-05-25".into(),
            runtime: String::new(),
            description: "In space...".into(),
            trailer_url: None,
        };
        assert_eq!(fields.missing_fields(), vec!["genre", "runtime"]);
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: UserId::from(1),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["fName"], "Ada");
        assert_eq!(json["lName"], "Lovelace");
        assert!(json.get("password_hash").is_none());
    }
}
