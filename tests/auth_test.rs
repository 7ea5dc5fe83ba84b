//! Integration tests for signup, login, logout and the recommender call.

mod common;

use axum::http::StatusCode;
use cinestream::config::Config;
use common::{body_json, TestHarness};
use wiremock::matchers::{body_json as body_matches, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signup_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "fName": "Ada",
        "lName": "Lovelace",
        "email": email,
        "password": "engine",
    })
}

#[tokio::test]
async fn signup_then_login_without_recommender() {
    let h = TestHarness::new();

    let resp = h.post_json("/api/auth/signup", signup_body("ada@example.com")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    let json = h.login("ada@example.com", "engine").await;
    assert_eq!(json["success"], true);
    assert_eq!(json["recommendations"], serde_json::json!([]));

    let resp = h.get("/api/auth/profile").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile = body_json(resp).await;
    assert_eq!(profile["fName"], "Ada");
    assert_eq!(profile["email"], "ada@example.com");
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let h = TestHarness::new();
    h.post_json("/api/auth/signup", signup_body("dup@example.com")).await;

    let resp = h.post_json("/api/auth/signup", signup_body("DUP@example.com")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["code"], "conflict");
}

#[tokio::test]
async fn signup_requires_all_fields() {
    let h = TestHarness::new();
    let resp = h
        .post_json(
            "/api/auth/signup",
            serde_json::json!({ "fName": "", "lName": "X", "email": "x@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let h = TestHarness::new();
    h.create_user("Alan", "alan@example.com", "enigma");

    let resp = h
        .post_json(
            "/api/auth/login",
            serde_json::json!({ "email": "alan@example.com", "password": "bombe" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = h
        .post_json(
            "/api/auth/login",
            serde_json::json!({ "email": "nobody@example.com", "password": "bombe" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_requires_login() {
    let h = TestHarness::new();
    let resp = h.get("/api/auth/profile").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_login() {
    let h = TestHarness::new();
    h.create_user("Alan", "alan@example.com", "enigma");
    h.login("alan@example.com", "enigma").await;
    assert_eq!(h.get("/api/auth/profile").await.status(), StatusCode::OK);

    let resp = h.post_json("/api/auth/logout", serde_json::json!({})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.get("/api/auth/profile").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_returns_recommendations() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.recommender.url = Some(format!("{}/recommend", server.uri()));
    let h = TestHarness::with_config(config);
    let user = h.create_user("Grace", "grace@example.com", "cobol");

    Mock::given(method("POST"))
        .and(path("/recommend"))
        .and(body_matches(serde_json::json!({ "user_id": user.id.get() })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "title": "Heat" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let json = h.login("grace@example.com", "cobol").await;
    assert_eq!(json["recommendations"][0]["title"], "Heat");
}

#[tokio::test]
async fn failing_recommender_still_logs_in() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.recommender.url = Some(format!("{}/recommend", server.uri()));
    let h = TestHarness::with_config(config);
    h.create_user("Grace", "grace@example.com", "cobol");

    Mock::given(method("POST"))
        .and(path("/recommend"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let json = h.login("grace@example.com", "cobol").await;
    assert_eq!(json["recommendations"], serde_json::json!([]));
    assert_eq!(h.get("/api/auth/profile").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_is_rate_limited() {
    let mut config = Config::default();
    config.rate_limit.login_per_minute = 2;
    let h = TestHarness::with_config(config);

    let attempt = || {
        h.post_json(
            "/api/auth/login",
            serde_json::json!({ "email": "x@example.com", "password": "y" }),
        )
    };
    assert_eq!(attempt().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(attempt().await.status(), StatusCode::UNAUTHORIZED);

    let resp = attempt().await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(resp).await["code"], "rate_limited");
}

#[tokio::test]
async fn login_limit_leaves_other_routes_alone() {
    let mut config = Config::default();
    config.rate_limit.login_per_minute = 1;
    let h = TestHarness::with_config(config);

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        let resp = h.post_json("/api/auth/signup", signup_body(email)).await;
        assert_eq!(resp.status(), StatusCode::OK, "signup for {email}");
    }

    h.login("a@example.com", "engine").await;
    assert_eq!(h.get("/api/auth/profile").await.status(), StatusCode::OK);
    let resp = h.post_json("/api/auth/logout", serde_json::json!({})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .post_json(
            "/api/auth/login",
            serde_json::json!({ "email": "b@example.com", "password": "engine" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn admin_email_comes_from_config() {
    let mut config = Config::default();
    config.server.admin_email = Some("admin@example.com".into());
    let h = TestHarness::with_config(config);

    let json = body_json(h.get("/api/admin-email").await).await;
    assert_eq!(json["email"], "admin@example.com");
}
