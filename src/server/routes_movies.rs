//! Movie catalogue routes, including multipart upload of the video and
//! poster assets.

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use cinestream_common::paths::{upload_file_name, AssetKind};
use cinestream_common::{Error, MovieId};
use cinestream_db::models::{Movie, MovieFields};
use cinestream_db::pool::get_conn;
use cinestream_db::queries::movies;
use serde::{Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};
use tokio::io::AsyncWriteExt;
use utoipa::{IntoParams, ToSchema};

use super::error::{ApiResult, AppError};
use super::AppContext;

/// Create movie catalogue routes.
pub fn movie_routes(max_upload_bytes: usize) -> Router<AppContext> {
    Router::new()
        .route(
            "/movies",
            get(list_movies)
                .post(create_movie)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/movies/search", get(search_movies))
        .route(
            "/movies/:movie_id",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
}

/// Movie record as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub rdate: String,
    pub runtime: String,
    pub description: String,
    pub trailer_url: Option<String>,
    /// Stored path of the video asset
    pub filepath: String,
    /// Stored path of the poster asset
    pub imgpath: String,
    pub created_at: DateTime<Utc>,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id.get(),
            title: movie.title,
            genre: movie.genre,
            rdate: movie.rdate,
            runtime: movie.runtime,
            description: movie.description,
            trailer_url: movie.trailer_url,
            filepath: movie.filepath,
            imgpath: movie.imgpath,
            created_at: movie.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieListResponse {
    pub success: bool,
    pub data: Vec<MovieResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieDetailResponse {
    pub success: bool,
    pub data: MovieResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieCreatedResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieDeletedResponse {
    pub success: bool,
    pub message: String,
    /// Asset files that could not be removed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_errors: Vec<String>,
}

/// Metadata accepted by `PATCH /api/movies/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMovieRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub rdate: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub trailer_url: Option<String>,
}

impl From<UpdateMovieRequest> for MovieFields {
    fn from(req: UpdateMovieRequest) -> Self {
        Self {
            title: req.title,
            genre: req.genre,
            rdate: req.rdate,
            runtime: req.runtime,
            description: req.description,
            trailer_url: req.trailer_url.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Substring of the title
    pub title: Option<String>,
    /// Substring of the genre
    pub genre: Option<String>,
}

fn require_fields(fields: &MovieFields) -> Result<(), Error> {
    let missing = fields.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// List all movies.
#[utoipa::path(
    get,
    path = "/api/movies",
    tag = "movies",
    responses((status = 200, description = "All movies", body = MovieListResponse))
)]
pub async fn list_movies(State(ctx): State<AppContext>) -> ApiResult<Json<MovieListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let data = movies::list_movies(&conn)?;

    Ok(Json(MovieListResponse {
        success: true,
        data: data.into_iter().map(MovieResponse::from).collect(),
    }))
}

/// Search movies by title and/or genre.
#[utoipa::path(
    get,
    path = "/api/movies/search",
    tag = "movies",
    params(SearchQuery),
    responses((status = 200, description = "Matching movies", body = MovieListResponse))
)]
pub async fn search_movies(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<MovieListResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let data = movies::search_movies(&conn, query.title.as_deref(), query.genre.as_deref())?;

    Ok(Json(MovieListResponse {
        success: true,
        data: data.into_iter().map(MovieResponse::from).collect(),
    }))
}

/// Get one movie.
#[utoipa::path(
    get,
    path = "/api/movies/{movie_id}",
    tag = "movies",
    params(("movie_id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Movie details", body = MovieDetailResponse),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn get_movie(
    State(ctx): State<AppContext>,
    Path(movie_id): Path<MovieId>,
) -> ApiResult<Json<MovieDetailResponse>> {
    let conn = get_conn(&ctx.db_pool)?;
    let movie = movies::get_movie(&conn, movie_id)?
        .ok_or_else(|| Error::not_found("movie", movie_id))?;

    Ok(Json(MovieDetailResponse {
        success: true,
        data: movie.into(),
    }))
}

/// Files written during one upload, removed again unless committed.
struct PendingUploads {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl PendingUploads {
    fn new() -> Self {
        Self {
            paths: Vec::new(),
            committed: false,
        }
    }

    async fn discard(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = ?path, error = %e, "Failed to remove partial upload");
            }
        }
    }
}

impl Drop for PendingUploads {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = ?path, error = %e, "Failed to remove partial upload");
            }
        }
    }
}

async fn store_asset(
    mut field: Field<'_>,
    kind: AssetKind,
    upload_root: &FsPath,
    pending: &mut PendingUploads,
) -> Result<String, Error> {
    let mime = field.content_type().unwrap_or_default().to_string();
    if !kind.accepts_mime(&mime) {
        return Err(Error::validation(match kind {
            AssetKind::Movie => "Only video files are allowed for movies",
            AssetKind::Poster => "Only image files are allowed for posters",
        }));
    }

    let original = field.file_name().unwrap_or_default().to_string();
    if !kind.accepts_file_name(&original) {
        let label = match kind {
            AssetKind::Movie => "movie",
            AssetKind::Poster => "poster",
        };
        return Err(Error::validation(format!(
            "Unsupported {label} file extension: {original:?}"
        )));
    }

    let dir = kind.dir(upload_root);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(upload_file_name(Utc::now(), &original));

    let mut file = tokio::fs::File::create(&path).await?;
    pending.paths.push(path.clone());

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| Error::validation(format!("Upload failed: {}", e.body_text())))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!(path = ?path, kind = kind.dir_name(), "Stored uploaded asset");
    Ok(path.to_string_lossy().into_owned())
}

/// Upload a movie with its poster.
///
/// Multipart fields: files `movie` and `poster`, text fields `title`,
/// `genre`, `rdate`, `runtime`, `description` and optional `trailer_url`.
#[utoipa::path(
    post,
    path = "/api/movies",
    tag = "movies",
    request_body(content_type = "multipart/form-data", description = "Movie and poster files plus metadata"),
    responses(
        (status = 200, description = "Movie inserted", body = MovieCreatedResponse),
        (status = 400, description = "Missing files or fields, wrong file type, or upload too large")
    )
)]
pub async fn create_movie(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> ApiResult<Json<MovieCreatedResponse>> {
    let upload_root = ctx.config.uploads.dir.clone();
    let mut pending = PendingUploads::new();
    let mut fields = MovieFields::default();
    let mut movie_path = None;
    let mut poster_path = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Upload failed: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(kind) = AssetKind::from_field(&name) {
            let stored = store_asset(field, kind, &upload_root, &mut pending).await?;
            match kind {
                AssetKind::Movie => movie_path = Some(stored),
                AssetKind::Poster => poster_path = Some(stored),
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| Error::validation(format!("Upload failed: {}", e.body_text())))?;
        match name.as_str() {
            "title" => fields.title = value,
            "genre" => fields.genre = value,
            "rdate" => fields.rdate = value,
            "runtime" => fields.runtime = value,
            "description" => fields.description = value,
            "trailer_url" => fields.trailer_url = Some(value).filter(|t| !t.trim().is_empty()),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let (Some(movie_path), Some(poster_path)) = (movie_path, poster_path) else {
        pending.discard().await;
        return Err(Error::validation(
            "File upload failed. Movie and poster files are required.",
        )
        .into());
    };

    if let Err(e) = require_fields(&fields) {
        pending.discard().await;
        return Err(e.into());
    }

    let movie = {
        let conn = get_conn(&ctx.db_pool)?;
        movies::create_movie(&conn, &fields, &movie_path, &poster_path)
    };
    let movie = match movie {
        Ok(movie) => movie,
        Err(e) => {
            pending.discard().await;
            return Err(AppError::from(e));
        }
    };
    pending.committed = true;

    tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie inserted");

    Ok(Json(MovieCreatedResponse {
        success: true,
        message: "Movie inserted successfully".to_string(),
        id: movie.id.get(),
    }))
}

/// Update a movie's metadata.
#[utoipa::path(
    patch,
    path = "/api/movies/{movie_id}",
    tag = "movies",
    params(("movie_id" = i64, Path, description = "Movie ID")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated"),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn update_movie(
    State(ctx): State<AppContext>,
    Path(movie_id): Path<MovieId>,
    Json(req): Json<UpdateMovieRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let fields = MovieFields::from(req);
    require_fields(&fields)?;

    let conn = get_conn(&ctx.db_pool)?;
    if !movies::update_movie(&conn, movie_id, &fields)? {
        return Err(Error::not_found("movie", movie_id).into());
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Movie updated successfully",
    })))
}

/// Delete a movie and, best-effort, its asset files.
#[utoipa::path(
    delete,
    path = "/api/movies/{movie_id}",
    tag = "movies",
    params(("movie_id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Movie deleted", body = MovieDeletedResponse),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn delete_movie(
    State(ctx): State<AppContext>,
    Path(movie_id): Path<MovieId>,
) -> ApiResult<Json<MovieDeletedResponse>> {
    let movie = {
        let conn = get_conn(&ctx.db_pool)?;
        let movie = movies::get_movie(&conn, movie_id)?
            .ok_or_else(|| Error::not_found("movie", movie_id))?;
        if !movies::delete_movie(&conn, movie_id)? {
            return Err(Error::not_found("movie", movie_id).into());
        }
        movie
    };

    let mut file_errors = Vec::new();
    for path in [&movie.filepath, &movie.imgpath] {
        if path.is_empty() {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path, error = %e, "Failed to delete movie asset");
            file_errors.push(format!("Failed to delete file {}: {}", path, e));
        }
    }

    tracing::info!(movie_id = %movie_id, "Movie deleted");

    Ok(Json(MovieDeletedResponse {
        success: true,
        message: "Movie deleted successfully".to_string(),
        file_errors,
    }))
}
