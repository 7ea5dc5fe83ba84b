//! Direct messages between users.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use cinestream_common::{Error, UserId};
use cinestream_db::models::Message;
use cinestream_db::pool::get_conn;
use cinestream_db::queries::messages;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ApiResult;
use super::routes_auth::require_login;
use super::AppContext;
use crate::session::Session;

/// Create message routes.
pub fn message_routes() -> Router<AppContext> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/:user_id", get(list_messages))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[schema(value_type = i64)]
    pub to_user_id: UserId,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DirectMessageResponse {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for DirectMessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.get(),
            from_user_id: message.from_user_id.get(),
            to_user_id: message.to_user_id.get(),
            message: message.message,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DirectMessageListResponse {
    /// Received messages first, then sent ones
    pub messages: Vec<DirectMessageResponse>,
}

/// Send a message as the logged-in user.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message sent"),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn send_message(
    State(ctx): State<AppContext>,
    session: Session,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let from = require_login(&session)?;
    if req.message.trim().is_empty() {
        return Err(Error::validation("Message is required").into());
    }

    let conn = get_conn(&ctx.db_pool)?;
    let sent = messages::send_message(&conn, from, req.to_user_id, &req.message)?;
    tracing::debug!(message_id = %sent.id, from = %from, to = %req.to_user_id, "Message sent");

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Messages received by, then sent by, a user.
#[utoipa::path(
    get,
    path = "/api/messages/{user_id}",
    tag = "messages",
    params(("user_id" = i64, Path, description = "User ID")),
    responses((status = 200, description = "Messages", body = DirectMessageListResponse))
)]
pub async fn list_messages(
    State(ctx): State<AppContext>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<DirectMessageListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let received = messages::received_messages(&conn, user_id)?;
    let sent = messages::sent_messages(&conn, user_id)?;

    Ok(Json(DirectMessageListResponse {
        messages: received
            .into_iter()
            .chain(sent)
            .map(DirectMessageResponse::from)
            .collect(),
    }))
}
