//! Middleware attaching a [`Session`] to every request.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use super::{Session, SessionManager};
use crate::server::error::AppError;

/// Resolve the caller's session, run the handler, then persist pending
/// changes and set or clear the session cookie.
///
/// A failure to flush pending changes replaces the handler's response with a
/// session error.
pub async fn session_middleware(
    State(manager): State<Arc<SessionManager>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_value = jar.get(manager.cookie_name()).map(|c| c.value().to_string());

    let session = match manager.open(cookie_value.as_deref()).await {
        Ok(session) => session,
        Err(e) => return AppError::from(e).into_response(),
    };
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    finish(&manager, &session, jar, response).await
}

async fn finish(
    manager: &SessionManager,
    session: &Session,
    jar: CookieJar,
    response: Response,
) -> Response {
    if session.is_destroyed() {
        return (jar.remove(manager.removal_cookie()), response).into_response();
    }

    if session.needs_save() {
        if let Err(e) = session.save().await {
            return AppError::from(e).into_response();
        }
    }

    if session.needs_cookie() {
        tracing::debug!("Issued new session cookie");
        return (jar.add(manager.cookie(&session.id())), response).into_response();
    }

    response
}
