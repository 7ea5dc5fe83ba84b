//! Per-client session state.
//!
//! Every request passing through [`session_middleware`] carries a [`Session`]
//! handle in its extensions. The handle is backed by a pluggable
//! [`SessionStore`] and addressed by a signed cookie. Handlers that must make
//! their writes visible to the very next request call [`Session::save`]
//! before responding; any other pending change is flushed by the middleware.

pub mod cookie;
mod memory;
mod middleware;
mod sqlite;

pub use memory::MemorySessionStore;
pub use middleware::session_middleware;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use cinestream_common::{Error, Result, UserId};
use cinestream_db::models::Movie;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::server::error::AppError;

/// Everything stored per session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Movie bound by the selector, read by the stream endpoint.
    #[serde(default)]
    pub movie_info: Option<Movie>,
    /// Acting user supplied together with the binding.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// User who logged in on this session.
    #[serde(default)]
    pub auth_user: Option<UserId>,
}

/// Backend holding serialized session state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a live session, `None` if unknown or expired.
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;

    /// Create or replace a session.
    async fn save(&self, id: &str, data: &SessionData, expires_at: DateTime<Utc>) -> Result<()>;

    /// Remove a session. Unknown ids are not an error.
    async fn destroy(&self, id: &str) -> Result<()>;

    /// Drop expired sessions, returning how many were removed.
    async fn cleanup_expired(&self) -> Result<usize>;
}

/// Opens sessions from cookies and builds the cookies that address them.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    secret: String,
    cookie_name: String,
    ttl: chrono::Duration,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            secret: config.secret.clone(),
            cookie_name: config.cookie_name.clone(),
            ttl: chrono::Duration::hours(config.timeout_hours as i64),
            secure: config.secure_cookie,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + self.ttl
    }

    /// Resume the session named by a signed cookie value, or start a new one.
    pub async fn open(self: &Arc<Self>, cookie_value: Option<&str>) -> Result<Session> {
        let existing = cookie_value.and_then(|v| cookie::verify(v, &self.secret));

        if let Some(id) = existing {
            if let Some(data) = self.store.load(&id).await? {
                return Ok(Session::new(self.clone(), id, data, false));
            }
            tracing::debug!("Session cookie refers to an unknown or expired session");
        }

        Ok(Session::new(
            self.clone(),
            cookie::generate_session_id(),
            SessionData::default(),
            true,
        ))
    }

    /// Cookie addressing the session `id`.
    pub fn cookie(&self, id: &str) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), cookie::sign(id, &self.secret)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    /// Expired cookie that makes the browser forget the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}

/// Start a background task that periodically sweeps expired sessions.
pub fn start_cleanup_task(manager: Arc<SessionManager>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            match manager.store.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Cleaned up expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
            }
        }
    })
}

struct SessionState {
    id: String,
    data: SessionData,
    is_new: bool,
    persisted: bool,
    dirty: bool,
    destroyed: bool,
}

/// Request-scoped handle on one client's session.
///
/// Clones share state, so the middleware sees what handlers changed.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    manager: Arc<SessionManager>,
}

impl Session {
    fn new(manager: Arc<SessionManager>, id: String, data: SessionData, is_new: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                id,
                data,
                is_new,
                persisted: !is_new,
                dirty: false,
                destroyed: false,
            })),
            manager,
        }
    }

    pub fn id(&self) -> String {
        self.state.lock().id.clone()
    }

    /// Snapshot of the session contents.
    pub fn data(&self) -> SessionData {
        self.state.lock().data.clone()
    }

    pub fn movie_info(&self) -> Option<Movie> {
        self.state.lock().data.movie_info.clone()
    }

    pub fn auth_user(&self) -> Option<UserId> {
        self.state.lock().data.auth_user
    }

    /// Bind a movie and acting user. Replaces any earlier binding.
    pub fn bind_movie(&self, movie: Movie, user_id: Option<UserId>) {
        self.update(|data| {
            data.movie_info = Some(movie);
            data.user_id = user_id;
        });
    }

    pub fn set_auth_user(&self, user_id: Option<UserId>) {
        self.update(|data| data.auth_user = user_id);
    }

    /// Apply a change and mark the session for saving.
    pub fn update(&self, f: impl FnOnce(&mut SessionData)) {
        let mut state = self.state.lock();
        f(&mut state.data);
        state.dirty = true;
    }

    /// Write the session to the store now.
    pub async fn save(&self) -> Result<()> {
        let (id, data) = {
            let state = self.state.lock();
            if state.destroyed {
                return Ok(());
            }
            (state.id.clone(), state.data.clone())
        };

        self.manager
            .store
            .save(&id, &data, self.manager.expires_at())
            .await
            .map_err(|e| match e {
                Error::Session(_) => e,
                other => Error::session(other),
            })?;

        let mut state = self.state.lock();
        state.dirty = false;
        state.persisted = true;
        Ok(())
    }

    /// Remove the session from the store and forget its contents.
    pub async fn destroy(&self) -> Result<()> {
        let id = self.id();
        self.manager.store.destroy(&id).await?;

        let mut state = self.state.lock();
        state.data = SessionData::default();
        state.destroyed = true;
        state.dirty = false;
        Ok(())
    }

    /// Untouched new sessions are never written to the store.
    fn needs_save(&self) -> bool {
        let state = self.state.lock();
        !state.destroyed && state.dirty
    }

    fn is_new(&self) -> bool {
        self.state.lock().is_new
    }

    /// A new session that reached the store and so needs a cookie.
    fn needs_cookie(&self) -> bool {
        let state = self.state.lock();
        state.is_new && state.persisted && !state.destroyed
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::from(Error::session("session layer is not installed")))
    }
}
