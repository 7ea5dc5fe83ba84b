//! OpenAPI documentation and Swagger UI integration.
//!
//! This module provides OpenAPI 3.0 documentation for the cinestream API.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppContext;

/// OpenAPI documentation for cinestream.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "cinestream API",
        version = "0.1.0",
        description = "Movie catalogue with session-bound playback over HTTP range requests",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        super::health_check,
        // Playback (routes_stream.rs)
        super::routes_stream::prepare_movie,
        super::routes_stream::watch_movie,
        super::routes_stream::movie_info,
        super::routes_stream::movie_info_by_title,
        super::routes_stream::video,
        // Catalogue (routes_movies.rs)
        super::routes_movies::list_movies,
        super::routes_movies::search_movies,
        super::routes_movies::get_movie,
        super::routes_movies::create_movie,
        super::routes_movies::update_movie,
        super::routes_movies::delete_movie,
        // Accounts (routes_auth.rs, routes_users.rs)
        super::routes_auth::signup,
        super::routes_auth::login,
        super::routes_auth::logout,
        super::routes_auth::profile,
        super::routes_auth::admin_email,
        super::routes_users::list_users,
        super::routes_users::get_user,
        super::routes_users::search_users,
        super::routes_users::update_user,
        super::routes_users::delete_user,
        // Community (routes_forums.rs, routes_messages.rs)
        super::routes_forums::list_forums,
        super::routes_forums::create_forum,
        super::routes_forums::delete_forum,
        super::routes_forums::list_comments,
        super::routes_forums::create_comment,
        super::routes_forums::delete_comment,
        super::routes_messages::send_message,
        super::routes_messages::list_messages,
    ),
    components(
        schemas(
            super::routes_stream::SelectMovieRequest,
            super::routes_stream::MessageResponse,
            super::routes_stream::MovieInfoResponse,
            super::routes_stream::TitleLookupResponse,
            super::routes_movies::MovieResponse,
            super::routes_movies::MovieListResponse,
            super::routes_movies::MovieDetailResponse,
            super::routes_movies::MovieCreatedResponse,
            super::routes_movies::MovieDeletedResponse,
            super::routes_movies::UpdateMovieRequest,
            super::routes_auth::UserResponse,
            super::routes_auth::SignupRequest,
            super::routes_auth::SignupResponse,
            super::routes_auth::LoginRequest,
            super::routes_auth::LoginResponse,
            super::routes_auth::AdminEmailResponse,
            super::routes_users::UserListResponse,
            super::routes_users::UpdateUserRequest,
            super::routes_forums::ForumResponse,
            super::routes_forums::CommentResponse,
            super::routes_forums::ForumListResponse,
            super::routes_forums::CommentListResponse,
            super::routes_forums::CreatedResponse,
            super::routes_forums::CreateForumRequest,
            super::routes_forums::CreateCommentRequest,
            super::routes_messages::SendMessageRequest,
            super::routes_messages::DirectMessageResponse,
            super::routes_messages::DirectMessageListResponse,
            ErrorBodySchema,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "playback", description = "Movie selection and range streaming"),
        (name = "movies", description = "Movie catalogue and uploads"),
        (name = "auth", description = "Signup, login and session endpoints"),
        (name = "users", description = "User directory"),
        (name = "forums", description = "Forum threads and comments"),
        (name = "messages", description = "Direct messages"),
    )
)]
pub struct ApiDoc;

/// JSON body of every API error response.
#[derive(utoipa::ToSchema)]
#[schema(as = ErrorBody)]
pub struct ErrorBodySchema {
    /// Always false
    pub success: bool,
    /// Human readable description
    pub error: String,
    /// Stable machine readable code, e.g. `not_found`
    pub code: String,
}

/// Create OpenAPI documentation routes.
///
/// Routes:
/// - `/docs` - Swagger UI
/// - `/openapi.json` - Raw OpenAPI JSON spec (served by SwaggerUi)
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_playback_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/video"));
        assert!(paths.contains_key("/prepare-movie"));
        assert!(paths.contains_key("/api/movies/{movie_id}"));
        assert!(paths.contains_key("/api/messages/{user_id}"));
    }
}
