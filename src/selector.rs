//! Session-scoped media selection.
//!
//! Binding a movie resolves its record, records it in the caller's session
//! together with the acting user, and flushes the session before returning
//! so the player's first `/video` request already sees the binding.

use cinestream_common::{Error, MovieId, Result, UserId};
use cinestream_db::models::Movie;
use cinestream_db::pool::{get_conn, DbPool};
use cinestream_db::queries::movies;
use std::sync::Arc;

use crate::config::AccessPolicyKind;
use crate::session::{Session, SessionData};

/// Decides whether a caller may bind a movie into their session.
pub trait AccessPolicy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// `Ok(())` to allow the binding.
    fn authorize(&self, session: &SessionData, acting_user: Option<UserId>) -> Result<()>;
}

/// Anyone may bind any movie.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenPolicy;

impl AccessPolicy for OpenPolicy {
    fn name(&self) -> &'static str {
        "open"
    }

    fn authorize(&self, _session: &SessionData, _acting_user: Option<UserId>) -> Result<()> {
        Ok(())
    }
}

/// The session must be logged in, as the acting user when one is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignedInPolicy;

impl AccessPolicy for SignedInPolicy {
    fn name(&self) -> &'static str {
        "signed_in"
    }

    fn authorize(&self, session: &SessionData, acting_user: Option<UserId>) -> Result<()> {
        let Some(logged_in) = session.auth_user else {
            return Err(Error::Unauthorized("Login required".into()));
        };

        match acting_user {
            Some(user) if user != logged_in => Err(Error::Forbidden(
                "Cannot select a movie on behalf of another user".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Build the policy configured under `access.policy`.
pub fn policy_for(kind: AccessPolicyKind) -> Arc<dyn AccessPolicy> {
    match kind {
        AccessPolicyKind::Open => Arc::new(OpenPolicy),
        AccessPolicyKind::SignedIn => Arc::new(SignedInPolicy),
    }
}

/// Bind `movie_id` into `session` for `user_id` and persist the session.
///
/// Unknown movies fail with [`Error::NotFound`] and leave the session as it
/// was. A failed flush surfaces as [`Error::Session`].
pub async fn select_movie(
    pool: &DbPool,
    policy: &dyn AccessPolicy,
    session: &Session,
    movie_id: MovieId,
    user_id: Option<UserId>,
) -> Result<Movie> {
    policy.authorize(&session.data(), user_id)?;

    // The pooled connection is released before the session is flushed,
    // which may need a connection of its own.
    let movie = {
        let conn = get_conn(pool)?;
        movies::fetch_movie_info(&conn, movie_id)?
    }
    .ok_or_else(|| Error::not_found("movie", movie_id))?;

    session.bind_movie(movie.clone(), user_id);
    session.save().await?;

    tracing::info!(
        movie_id = %movie.id,
        user_id = ?user_id.map(|u| u.get()),
        policy = policy.name(),
        "Bound movie to session"
    );

    Ok(movie)
}
