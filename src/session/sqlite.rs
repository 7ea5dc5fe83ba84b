//! Durable session store on the application database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinestream_common::{Error, Result};
use cinestream_db::models::StoredSession;
use cinestream_db::pool::{get_conn, DbPool};
use cinestream_db::queries::sessions;

use super::{SessionData, SessionStore};

/// Session store persisting JSON-encoded [`SessionData`] in the `sessions`
/// table, so sessions survive restarts.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let conn = get_conn(&self.pool)?;
        let Some(stored) = sessions::load_session(&conn, id, Utc::now())? else {
            return Ok(None);
        };

        match serde_json::from_str(&stored.data) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                // Unreadable rows are dropped rather than failing every request.
                tracing::warn!(error = %e, "Discarding undecodable session");
                sessions::delete_session(&conn, id)?;
                Ok(None)
            }
        }
    }

    async fn save(&self, id: &str, data: &SessionData, expires_at: DateTime<Utc>) -> Result<()> {
        let data = serde_json::to_string(data).map_err(Error::session)?;
        let conn = get_conn(&self.pool)?;
        sessions::save_session(
            &conn,
            &StoredSession {
                id: id.to_string(),
                data,
                expires_at,
            },
        )
        .map_err(Error::session)
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        sessions::delete_session(&conn, id)?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        sessions::delete_expired_sessions(&conn, Utc::now())
    }
}
