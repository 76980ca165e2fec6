//! Registration, login, token refresh and logout over HTTP.

use axum::http::StatusCode;
use serde_json::json;

use digital_mart_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_returns_session() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({"email": "Ann@Shop.io", "password": PASSWORD, "name": "Ann"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ann@shop.io");
    assert_eq!(body["user"]["displayName"], "Ann");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_register_twice_conflicts() {
    let app = TestApp::new();
    app.register("ann@shop.io").await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({"email": "ann@shop.io", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "An account with this email already exists");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({"email": "not-an-email", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({"email": "ann@shop.io", "password": "123"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new();
    app.register("ann@shop.io").await;

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({"email": "ann@shop.io", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_refresh_logout() {
    let app = TestApp::new();
    app.register("ann@shop.io").await;

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({"email": "ann@shop.io", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.post("/auth/refresh", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = body["token"].as_str().unwrap().to_string();
    assert_ne!(refreshed, token);

    // The old token was revoked by the refresh.
    let (status, _) = app.get("/cart", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/auth/logout", Some(&refreshed), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/cart", Some(&refreshed)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_provider_outage() {
    let app = TestApp::new();
    app.identity.set_offline(true);

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({"email": "ann@shop.io", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Service temporarily unavailable");
}
