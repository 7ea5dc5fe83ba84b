//! Movie selection and playback routes.
//!
//! The player flow is: bind a movie into the session with
//! `POST /prepare-movie` (or `POST /watch-movie`, which redirects to the
//! player page), read it back with `GET /movie-info`, then pull the video
//! chunk by chunk from `GET /video`.

use axum::{
    async_trait,
    extract::{FromRequest, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use cinestream_common::{Error, MovieId, UserId};
use cinestream_db::pool::get_conn;
use cinestream_db::queries::movies;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use super::error::{ApiResult, AppError};
use super::routes_movies::MovieResponse;
use super::AppContext;
use crate::selector;
use crate::session::Session;
use crate::streaming;

/// Create selection and playback routes.
pub fn stream_routes() -> Router<AppContext> {
    Router::new()
        .route("/prepare-movie", post(prepare_movie))
        .route("/watch-movie", post(watch_movie))
        .route("/movie-info", get(movie_info))
        .route("/movie-info/:title", get(movie_info_by_title))
        .route("/movie", get(movie_page))
        .route("/video", get(video))
}

/// Movie selection submitted by the catalogue page.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectMovieRequest {
    /// Movie to bind
    #[schema(value_type = i64)]
    pub movie_id: MovieId,
    /// Acting user
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub user_id: Option<UserId>,
}

/// Accepts a JSON body or an HTML form post.
pub struct SelectionBody(pub SelectMovieRequest);

#[async_trait]
impl<S> FromRequest<S> for SelectionBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let body = if is_form {
            Form::<SelectMovieRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| Error::validation(e.body_text()))?
        } else {
            Json::<SelectMovieRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| Error::validation(e.body_text()))?
        };

        Ok(Self(body))
    }
}

/// Generic success acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Session binding as returned by `GET /movie-info`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieInfoResponse {
    pub success: bool,
    pub movie_info: MovieResponse,
    #[schema(value_type = Option<i64>)]
    pub user_id: Option<UserId>,
}

/// Bind a movie into the caller's session.
#[utoipa::path(
    post,
    path = "/prepare-movie",
    tag = "playback",
    request_body = SelectMovieRequest,
    responses(
        (status = 200, description = "Movie bound to session", body = MessageResponse),
        (status = 401, description = "Login required by the access policy"),
        (status = 403, description = "Acting user differs from the logged-in user"),
        (status = 404, description = "Movie not found"),
        (status = 500, description = "Session could not be saved")
    )
)]
pub async fn prepare_movie(
    State(ctx): State<AppContext>,
    session: Session,
    SelectionBody(req): SelectionBody,
) -> ApiResult<Json<MessageResponse>> {
    selector::select_movie(
        &ctx.db_pool,
        ctx.access_policy.as_ref(),
        &session,
        req.movie_id,
        req.user_id,
    )
    .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Movie prepared successfully".to_string(),
    }))
}

/// Bind a movie and send the browser to the player page.
#[utoipa::path(
    post,
    path = "/watch-movie",
    tag = "playback",
    request_body = SelectMovieRequest,
    responses(
        (status = 303, description = "Redirect to /movie"),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn watch_movie(
    State(ctx): State<AppContext>,
    session: Session,
    SelectionBody(req): SelectionBody,
) -> ApiResult<Redirect> {
    selector::select_movie(
        &ctx.db_pool,
        ctx.access_policy.as_ref(),
        &session,
        req.movie_id,
        req.user_id,
    )
    .await?;

    Ok(Redirect::to("/movie"))
}

/// Read the movie bound to the session.
#[utoipa::path(
    get,
    path = "/movie-info",
    tag = "playback",
    responses(
        (status = 200, description = "Bound movie", body = MovieInfoResponse),
        (status = 400, description = "No movie info in session")
    )
)]
pub async fn movie_info(session: Session) -> ApiResult<Json<MovieInfoResponse>> {
    let data = session.data();
    let movie = data
        .movie_info
        .ok_or_else(|| Error::validation("No movie info in session"))?;

    Ok(Json(MovieInfoResponse {
        success: true,
        movie_info: movie.into(),
        user_id: data.user_id,
    }))
}

/// Movies with exactly this title.
#[derive(Debug, Serialize, ToSchema)]
pub struct TitleLookupResponse {
    pub data: Vec<MovieResponse>,
}

/// Look up movies by exact title.
#[utoipa::path(
    get,
    path = "/movie-info/{title}",
    tag = "playback",
    params(("title" = String, Path, description = "Exact movie title")),
    responses((status = 200, description = "Matching movies", body = TitleLookupResponse))
)]
pub async fn movie_info_by_title(
    State(ctx): State<AppContext>,
    Path(title): Path<String>,
) -> ApiResult<Json<TitleLookupResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let found = movies::find_movies_by_title(&conn, &title)?;

    Ok(Json(TitleLookupResponse {
        data: found.into_iter().map(MovieResponse::from).collect(),
    }))
}

/// Serve the player page once a movie is bound.
pub async fn movie_page(State(ctx): State<AppContext>, session: Session) -> Response {
    if session.movie_info().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            "No movie info in session. Please select a movie first.",
        )
            .into_response();
    }

    let page = ctx
        .config
        .server
        .player_page
        .clone()
        .or_else(|| ctx.config.server.static_dir.as_ref().map(|d| d.join("movie.html")));

    match page {
        Some(page) => serve_page(page).await,
        None => (StatusCode::NOT_FOUND, "Player page not configured").into_response(),
    }
}

async fn serve_page(page: PathBuf) -> Response {
    match tokio::fs::read_to_string(&page).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(path = ?page, error = %e, "Player page unavailable");
            (StatusCode::NOT_FOUND, "Page not found").into_response()
        }
    }
}

/// Stream one chunk of the bound movie.
///
/// Requires a `Range` header. Responds `206` with at most
/// `streaming.chunk_size` bytes starting at the requested offset.
#[utoipa::path(
    get,
    path = "/video",
    tag = "playback",
    params(("Range" = String, Header, description = "e.g. bytes=0-")),
    responses(
        (status = 206, description = "One chunk of the bound video", content_type = "video/mp4"),
        (status = 400, description = "Missing Range header or no movie bound"),
        (status = 404, description = "Video file missing"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn video(State(ctx): State<AppContext>, session: Session, headers: HeaderMap) -> Response {
    let Some(range) = headers.get(header::RANGE) else {
        return streaming::plain_error_response(&Error::validation("Requires Range header"));
    };
    // Non-ASCII header bytes are treated like any other unparseable range.
    let range = range.to_str().unwrap_or_default();

    let Some(movie) = session.movie_info() else {
        return streaming::plain_error_response(&Error::validation("No movie info in session"));
    };

    match streaming::serve_range(
        std::path::Path::new(&movie.filepath),
        range,
        &ctx.config.streaming,
    )
    .await
    {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, Error::NotFound { .. }) {
                tracing::error!(path = %movie.filepath, "Video file not found");
            }
            streaming::plain_error_response(&e)
        }
    }
}
