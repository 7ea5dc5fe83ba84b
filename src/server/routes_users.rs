//! User directory routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use cinestream_common::{Error, UserId};
use cinestream_db::pool::get_conn;
use cinestream_db::queries::users;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ApiResult;
use super::routes_auth::{hash_password_blocking, require_login, UserResponse};
use super::AppContext;
use crate::session::Session;

/// Create user directory routes.
pub fn user_routes() -> Router<AppContext> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/search/:first_name/:last_name", get(search_users))
        .route(
            "/users/:user_id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub success: bool,
    pub data: Vec<UserResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(rename = "fName")]
    pub first_name: String,
    #[serde(rename = "lName")]
    pub last_name: String,
    pub email: String,
    /// New password; the current one is kept when absent or empty
    #[serde(default)]
    pub password: Option<String>,
}

/// Only the logged-in user may change or remove their own account.
fn require_self(session: &Session, user_id: UserId) -> Result<(), Error> {
    let current = require_login(session)?;
    if current != user_id {
        return Err(Error::Forbidden("Cannot modify another user's account".into()));
    }
    Ok(())
}

/// List all users.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses((status = 200, description = "All users", body = UserListResponse))
)]
pub async fn list_users(State(ctx): State<AppContext>) -> ApiResult<Json<UserListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let data = users::list_users(&conn)?;

    Ok(Json(UserListResponse {
        success: true,
        data: data.into_iter().map(UserResponse::from).collect(),
    }))
}

/// Get one user.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    tag = "users",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<UserResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let user = users::get_user(&conn, user_id)?.ok_or_else(|| Error::not_found("user", user_id))?;

    Ok(Json(user.into()))
}

/// Search users by first and last name.
#[utoipa::path(
    get,
    path = "/api/users/search/{first_name}/{last_name}",
    tag = "users",
    params(
        ("first_name" = String, Path, description = "Part of the first name"),
        ("last_name" = String, Path, description = "Part of the last name")
    ),
    responses((status = 200, description = "Matching users", body = UserListResponse))
)]
pub async fn search_users(
    State(ctx): State<AppContext>,
    Path((first_name, last_name)): Path<(String, String)>,
) -> ApiResult<Json<UserListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let last_name = last_name.trim().to_lowercase();

    let data = users::search_users_by_name(&conn, &first_name)?
        .into_iter()
        .filter(|u| {
            u.first_name
                .to_lowercase()
                .contains(&first_name.trim().to_lowercase())
                && u.last_name.to_lowercase().contains(&last_name)
        })
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        success: true,
        data,
    }))
}

/// Update the logged-in user's profile.
#[utoipa::path(
    patch,
    path = "/api/users/{user_id}",
    tag = "users",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Another user's account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_user(
    State(ctx): State<AppContext>,
    session: Session,
    Path(user_id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    require_self(&session, user_id)?;
    if [&req.first_name, &req.last_name, &req.email]
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(Error::validation("Missing required fields").into());
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };

    let conn = get_conn(&ctx.db_pool)?;
    if !users::update_user(&conn, user_id, &req.first_name, &req.last_name, &req.email)? {
        return Err(Error::not_found("user", user_id).into());
    }
    if let Some(hash) = password_hash {
        users::update_password(&conn, user_id, &hash)?;
        tracing::info!(user_id = %user_id, "Password changed");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "User updated successfully",
    })))
}

/// Delete the logged-in user's account and end their session.
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    tag = "users",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Another user's account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(ctx): State<AppContext>,
    session: Session,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<serde_json::Value>> {
    require_self(&session, user_id)?;

    let deleted = {
        let conn = get_conn(&ctx.db_pool)?;
        users::delete_user(&conn, user_id)?
    };
    if !deleted {
        return Err(Error::not_found("user", user_id).into());
    }

    session.destroy().await?;
    tracing::info!(user_id = %user_id, "User deleted");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}
