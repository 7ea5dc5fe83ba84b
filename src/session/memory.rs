//! In-process session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinestream_common::Result;
use dashmap::DashMap;
use std::sync::Arc;

use super::{SessionData, SessionStore};

/// Thread-safe session store for development and tests.
///
/// Sessions are lost on restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, (SessionData, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let now = Utc::now();
        let live = self
            .sessions
            .get(id)
            .map(|entry| (entry.1 > now).then(|| entry.0.clone()));

        match live {
            Some(Some(data)) => Ok(Some(data)),
            Some(None) => {
                self.sessions.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, expires_at: DateTime<Utc>) -> Result<()> {
        self.sessions
            .insert(id.to_string(), (data.clone(), expires_at));
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            tracing::debug!(removed, "Removed expired in-memory sessions");
        }
        Ok(removed)
    }
}
