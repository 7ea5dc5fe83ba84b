//! Forum threads and their comments.

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use cinestream_common::{CommentId, Error, ForumId, UserId};
use cinestream_db::models::{Comment, Forum};
use cinestream_db::pool::get_conn;
use cinestream_db::queries::{comments, forums};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ApiResult;
use super::AppContext;
use crate::session::Session;

/// Create forum routes.
pub fn forum_routes() -> Router<AppContext> {
    Router::new()
        .route("/forums", get(list_forums).post(create_forum))
        .route("/forums/:forum_id", delete(delete_forum))
        .route(
            "/forums/:forum_id/comments",
            get(list_comments).post(create_comment),
        )
        .route("/comments/:comment_id", delete(delete_comment))
}

/// Posting requires a logged-in session; anonymous writers get 403.
fn poster(session: &Session) -> Result<UserId, Error> {
    session
        .auth_user()
        .ok_or_else(|| Error::Forbidden("Login required".into()))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Forum> for ForumResponse {
    fn from(forum: Forum) -> Self {
        Self {
            id: forum.id.get(),
            title: forum.title,
            content: forum.content,
            user_id: forum.user_id.get(),
            created_at: forum.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub forum_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id.get(),
            forum_id: comment.forum_id.get(),
            user_id: comment.user_id.get(),
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumListResponse {
    pub success: bool,
    pub data: Vec<ForumResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentListResponse {
    pub success: bool,
    pub data: Vec<CommentResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateForumRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// List all forum threads.
#[utoipa::path(
    get,
    path = "/api/forums",
    tag = "forums",
    responses((status = 200, description = "All threads", body = ForumListResponse))
)]
pub async fn list_forums(State(ctx): State<AppContext>) -> ApiResult<Json<ForumListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let data = forums::list_forums(&conn)?;

    Ok(Json(ForumListResponse {
        success: true,
        data: data.into_iter().map(ForumResponse::from).collect(),
    }))
}

/// Open a thread.
#[utoipa::path(
    post,
    path = "/api/forums",
    tag = "forums",
    request_body = CreateForumRequest,
    responses(
        (status = 200, description = "Thread created", body = CreatedResponse),
        (status = 400, description = "Missing title or content"),
        (status = 403, description = "Login required")
    )
)]
pub async fn create_forum(
    State(ctx): State<AppContext>,
    session: Session,
    Json(req): Json<CreateForumRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let user_id = poster(&session)?;
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(Error::validation("Title and content are required").into());
    }

    let conn = get_conn(&ctx.db_pool)?;
    let forum = forums::create_forum(&conn, user_id, &req.title, &req.content)?;
    tracing::debug!(forum_id = %forum.id, user_id = %user_id, "Forum created");

    Ok(Json(CreatedResponse {
        success: true,
        id: forum.id.get(),
    }))
}

/// Delete one of the caller's own threads.
#[utoipa::path(
    delete,
    path = "/api/forums/{forum_id}",
    tag = "forums",
    params(("forum_id" = i64, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Thread deleted"),
        (status = 403, description = "Login required"),
        (status = 404, description = "No such thread owned by the caller")
    )
)]
pub async fn delete_forum(
    State(ctx): State<AppContext>,
    session: Session,
    Path(forum_id): Path<ForumId>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = poster(&session)?;

    let conn = get_conn(&ctx.db_pool)?;
    if !forums::delete_forum(&conn, forum_id, user_id)? {
        return Err(Error::not_found("forum", forum_id).into());
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Comments on a thread, in posting order.
#[utoipa::path(
    get,
    path = "/api/forums/{forum_id}/comments",
    tag = "forums",
    params(("forum_id" = i64, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Comments", body = CommentListResponse),
        (status = 404, description = "No comments for this thread")
    )
)]
pub async fn list_comments(
    State(ctx): State<AppContext>,
    Path(forum_id): Path<ForumId>,
) -> ApiResult<Json<CommentListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let data = comments::list_comments_for_forum(&conn, forum_id)?;
    if data.is_empty() {
        return Err(Error::not_found("comments for forum", forum_id).into());
    }

    Ok(Json(CommentListResponse {
        success: true,
        data: data.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// Comment on a thread.
#[utoipa::path(
    post,
    path = "/api/forums/{forum_id}/comments",
    tag = "forums",
    params(("forum_id" = i64, Path, description = "Forum ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CreatedResponse),
        (status = 403, description = "Login required"),
        (status = 404, description = "Forum not found")
    )
)]
pub async fn create_comment(
    State(ctx): State<AppContext>,
    session: Session,
    Path(forum_id): Path<ForumId>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let user_id = poster(&session)?;
    if req.content.trim().is_empty() {
        return Err(Error::validation("Content is required").into());
    }

    let conn = get_conn(&ctx.db_pool)?;
    let comment = comments::create_comment(&conn, forum_id, user_id, &req.content)?;

    Ok(Json(CreatedResponse {
        success: true,
        id: comment.id.get(),
    }))
}

/// Delete one of the caller's own comments.
#[utoipa::path(
    delete,
    path = "/api/comments/{comment_id}",
    tag = "forums",
    params(("comment_id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Login required"),
        (status = 404, description = "No such comment owned by the caller")
    )
)]
pub async fn delete_comment(
    State(ctx): State<AppContext>,
    session: Session,
    Path(comment_id): Path<CommentId>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = poster(&session)?;

    let conn = get_conn(&ctx.db_pool)?;
    if !comments::delete_comment(&conn, comment_id, user_id)? {
        return Err(Error::not_found("comment", comment_id).into());
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
