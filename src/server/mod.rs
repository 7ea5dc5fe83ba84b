use crate::config::{Config, SessionStoreKind};
use crate::recommender::RecommenderClient;
use crate::selector::{self, AccessPolicy};
use crate::session::{
    self, start_cleanup_task, MemorySessionStore, SessionManager, SessionStore,
    SqliteSessionStore,
};
use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use cinestream_common::paths::AssetKind;
use cinestream_db::pool::{init_pool, DbPool};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod openapi;
pub mod rate_limit;
pub mod routes_auth;
pub mod routes_forums;
pub mod routes_messages;
pub mod routes_movies;
pub mod routes_stream;
pub mod routes_users;

use rate_limit::{create_limiter, SharedLimiter};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Database connection pool
    pub db_pool: DbPool,
    /// Opens and persists per-client sessions
    pub sessions: Arc<SessionManager>,
    /// Decides who may bind a movie into their session
    pub access_policy: Arc<dyn AccessPolicy>,
    /// Recommendation service, when configured
    pub recommender: Option<RecommenderClient>,
    /// Attempt budget for `POST /api/auth/login`
    pub login_limiter: SharedLimiter,
}

impl AppContext {
    /// Build the context, choosing the session store from `session.store`.
    pub fn new(config: Config, db_pool: DbPool) -> Self {
        let store: Arc<dyn SessionStore> = match config.session.store {
            SessionStoreKind::Memory => Arc::new(MemorySessionStore::new()),
            SessionStoreKind::Sqlite => Arc::new(SqliteSessionStore::new(db_pool.clone())),
        };
        Self::with_session_store(config, db_pool, store)
    }

    /// Build the context around an explicit session store.
    pub fn with_session_store(
        config: Config,
        db_pool: DbPool,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(store, &config.session));
        let access_policy = selector::policy_for(config.access.policy);
        let recommender = RecommenderClient::from_config(&config.recommender);
        let login_limiter = create_limiter(config.rate_limit.login_per_minute);

        Self {
            config: Arc::new(config),
            db_pool,
            sessions,
            access_policy,
            recommender,
            login_limiter,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let config = ctx.config.clone();

    let api = Router::new()
        .merge(routes_movies::movie_routes(config.uploads.max_upload_bytes))
        .merge(routes_auth::auth_routes(ctx.login_limiter.clone()))
        .merge(routes_users::user_routes())
        .merge(routes_forums::forum_routes())
        .merge(routes_messages::message_routes())
        // OpenAPI documentation (Swagger UI at /api/docs)
        .merge(openapi::openapi_routes());

    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(routes_stream::stream_routes())
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&config.uploads.dir));

    // Static pages; anything else is a plain 404.
    let app = match &config.server.static_dir {
        Some(dir) if dir.exists() => {
            tracing::info!("Serving static files from {:?}", dir);
            app.fallback_service(
                ServeDir::new(dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(get(page_not_found)),
            )
        }
        Some(dir) => {
            tracing::warn!("Static directory {:?} does not exist", dir);
            app.fallback(page_not_found)
        }
        None => app.fallback(page_not_found),
    };

    app.layer(middleware::from_fn_with_state(
        ctx.sessions.clone(),
        session::session_middleware,
    ))
    .layer(cors_layer(config.server.cors_origin.as_deref()))
    .layer(TraceLayer::new_for_http())
    .with_state(ctx)
}

/// CORS for the web client. A configured origin may send the session cookie;
/// without one any origin is allowed, but without credentials.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::RANGE])
        .expose_headers([header::CONTENT_RANGE, header::ACCEPT_RANGES, header::CONTENT_LENGTH]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid CORS origin: {}", e);
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is up"))
)]
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn page_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Page not found")
}

/// Create the upload directories for every asset kind.
pub async fn prepare_upload_dirs(config: &Config) -> Result<()> {
    for kind in [AssetKind::Movie, AssetKind::Poster] {
        let dir = kind.dir(&config.uploads.dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {:?}", dir))?;
    }
    Ok(())
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    prepare_upload_dirs(&config).await?;

    let db_path = config.server.db_path.to_string_lossy().into_owned();
    let db_pool = init_pool(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path))?;
    tracing::info!("Database ready at {}", db_path);

    let cleanup_interval = config.session.cleanup_interval_secs;
    let ctx = AppContext::new(config, db_pool);
    start_cleanup_task(ctx.sessions.clone(), cleanup_interval);

    tracing::info!(
        policy = ctx.access_policy.name(),
        range_mode = ?ctx.config.streaming.range_mode,
        chunk_size = ctx.config.streaming.chunk_size,
        recommender = ctx.recommender.is_some(),
        "Application context ready"
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_configured_origin() {
        // Building must not panic: credentials are only combined with an exact origin.
        let _ = cors_layer(Some("http://localhost:3000"));
        let _ = cors_layer(None);
        let _ = cors_layer(Some("bad\norigin"));
    }
}
