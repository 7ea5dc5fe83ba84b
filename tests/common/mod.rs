//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a default config
//! with an upload directory in a temp dir, an in-memory session store and
//! the full [`AppContext`]. Requests go through the router with
//! `tower::ServiceExt::oneshot`; [`TestHarness::send`] carries the session
//! cookie from one response to the next request like a browser would.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tempfile::TempDir;
use tower::ServiceExt;

use cinestream::config::Config;
use cinestream::server::{create_router, AppContext};
use cinestream::session::MemorySessionStore;
use cinestream_db::models::{Movie, MovieFields};
use cinestream_db::pool::{init_memory_pool, DbPool};

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub sessions: Arc<MemorySessionStore>,
    pub dir: TempDir,
    cookie: Mutex<Option<String>>,
}

impl TestHarness {
    /// Create a new harness with default configuration and in-memory DB.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration and in-memory DB.
    ///
    /// The upload directory is always redirected into a temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.uploads.dir = dir.path().join("uploads");
        config.session.secret = "integration-test-secret".to_string();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let sessions = Arc::new(MemorySessionStore::new());
        let ctx = AppContext::with_session_store(config, db.clone(), sessions.clone());

        Self {
            ctx,
            db,
            sessions,
            dir,
            cookie: Mutex::new(None),
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> cinestream_db::pool::PooledConnection {
        cinestream_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Write `len` bytes of a repeating pattern to a file under the temp dir.
    pub fn write_video(&self, name: &str, len: usize) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, pattern(len)).expect("failed to write video");
        path
    }

    /// Insert a movie row pointing at `video`.
    pub fn insert_movie(&self, title: &str, video: &Path) -> Movie {
        let fields = MovieFields {
            title: title.to_string(),
            genre: "Drama".to_string(),
            rdate: "2001-01-01".to_string(),
            runtime: "120".to_string(),
            description: "A test film.".to_string(),
            trailer_url: None,
        };
        cinestream_db::queries::movies::create_movie(
            &self.conn(),
            &fields,
            video.to_str().expect("utf-8 path"),
            "poster.png",
        )
        .expect("failed to insert movie")
    }

    /// Create a user with a bcrypt-hashed password.
    pub fn create_user(&self, first: &str, email: &str, password: &str) -> cinestream_db::models::User {
        let hash = bcrypt::hash(password, 4).expect("failed to hash");
        cinestream_db::queries::users::create_user(&self.conn(), first, "Tester", email, &hash)
            .expect("failed to create user")
    }

    /// Send a request, attaching and then updating the stored session cookie.
    pub async fn send(&self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = self.cookie.lock().clone() {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().expect("valid cookie header"));
        }

        let response = self.router().oneshot(request).await.expect("router failed");

        if let Some(set) = response.headers().get(header::SET_COOKIE) {
            let pair = set
                .to_str()
                .expect("ascii cookie")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            let mut cookie = self.cookie.lock();
            if pair.ends_with('=') {
                *cookie = None;
            } else {
                *cookie = Some(pair);
            }
        }

        response
    }

    /// Forget the session cookie, as a fresh client would.
    pub fn clear_cookie(&self) {
        *self.cookie.lock() = None;
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_range(&self, uri: &str, range: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header(header::RANGE, range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(&self, method: &str, uri: &str, json: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> Response<Body> {
        self.send_json("POST", uri, json).await
    }

    /// Bind a movie through `POST /prepare-movie`.
    pub async fn prepare(&self, movie: &Movie) -> Response<Body> {
        self.post_json(
            "/prepare-movie",
            serde_json::json!({ "movieId": movie.id.get(), "userId": 1 }),
        )
        .await
    }

    /// Log in through the API, asserting success.
    pub async fn login(&self, email: &str, password: &str) -> serde_json::Value {
        let response = self
            .post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

/// Deterministic file content: byte `i` is `i % 251`.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header"))
        .to_str()
        .unwrap()
}
