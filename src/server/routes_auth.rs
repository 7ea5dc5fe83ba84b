//! Account routes: signup, login, logout, profile.

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cinestream_common::{Error, UserId};
use cinestream_db::models::User;
use cinestream_db::pool::get_conn;
use cinestream_db::queries::users;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ApiResult;
use super::rate_limit::{rate_limit_middleware, SharedLimiter};
use super::AppContext;
use crate::session::Session;

/// Create account routes. `login_limiter` guards the login endpoint only.
pub fn auth_routes(login_limiter: SharedLimiter) -> Router<AppContext> {
    // The limiter extension must wrap the middleware that reads it.
    let login_route = Router::new()
        .route("/auth/login", post(login))
        .route_layer(middleware::from_fn(rate_limit_middleware))
        .route_layer(Extension(login_limiter));

    Router::new()
        .route("/auth/signup", post(signup))
        .merge(login_route)
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route("/admin-email", get(admin_email))
}

/// Hash a password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, Error> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

pub(crate) async fn hash_password_blocking(password: String) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password_blocking(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// The user logged in on this session, or 401.
pub(crate) fn require_login(session: &Session) -> Result<UserId, Error> {
    session
        .auth_user()
        .ok_or_else(|| Error::Unauthorized("Login required".into()))
}

/// User record as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    #[serde(rename = "fName")]
    pub first_name: String,
    #[serde(rename = "lName")]
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.get(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[serde(rename = "fName")]
    pub first_name: String,
    #[serde(rename = "lName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// Whatever the recommendation service answered; empty when unavailable
    #[schema(value_type = Object)]
    pub recommendations: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminEmailResponse {
    pub email: Option<String>,
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = SignupResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(ctx): State<AppContext>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    if [&req.first_name, &req.last_name, &req.email, &req.password]
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(Error::validation("Missing required fields").into());
    }

    let hash = hash_password_blocking(req.password).await?;

    let conn = get_conn(&ctx.db_pool)?;
    let user = users::create_user(&conn, &req.first_name, &req.last_name, &req.email, &hash)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(SignupResponse {
        success: true,
        message: "User registered successfully".to_string(),
        id: user.id.get(),
    }))
}

/// Log in and fetch recommendations for the user.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = {
        let conn = get_conn(&ctx.db_pool)?;
        users::get_user_by_email(&conn, &req.email)?
    };

    let invalid = || Error::Unauthorized("Invalid email or password".into());
    let user = user.ok_or_else(invalid)?;
    if !verify_password_blocking(req.password, user.password_hash.clone()).await {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid().into());
    }

    session.set_auth_user(Some(user.id));
    session.save().await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let recommendations = match &ctx.recommender {
        Some(client) => client.recommend_or_empty(user.id).await,
        None => serde_json::Value::Array(Vec::new()),
    };

    Ok(Json(LoginResponse {
        success: true,
        recommendations,
    }))
}

/// End the session, dropping any movie binding with it.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(session: Session) -> ApiResult<Json<serde_json::Value>> {
    session.destroy().await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Logged out",
    })))
}

/// The logged-in user.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn profile(
    State(ctx): State<AppContext>,
    session: Session,
) -> ApiResult<Json<UserResponse>> {
    let user_id = require_login(&session)?;
    let conn = get_conn(&ctx.db_pool)?;
    let user = users::get_user(&conn, user_id)?
        .ok_or_else(|| Error::Unauthorized("Login required".into()))?;

    Ok(Json(user.into()))
}

/// Contact address of the site administrator.
#[utoipa::path(
    get,
    path = "/api/admin-email",
    tag = "auth",
    responses((status = 200, description = "Admin email", body = AdminEmailResponse))
)]
pub async fn admin_email(State(ctx): State<AppContext>) -> Json<AdminEmailResponse> {
    Json(AdminEmailResponse {
        email: ctx.config.server.admin_email.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("hunter3", &hash).unwrap());
    }

    #[tokio::test]
    async fn garbage_hash_never_verifies() {
        assert!(!verify_password_blocking("pw".into(), "not-a-hash".into()).await);
    }

    #[test]
    fn user_response_uses_client_field_names() {
        let user = User {
            id: UserId::from(9),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            password_hash: "$2b$x".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["fName"], "Grace");
        assert_eq!(json["lName"], "Hopper");
        assert!(json.get("password_hash").is_none());
    }
}
