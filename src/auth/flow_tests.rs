//! End-to-end authentication flows driven through the HTTP router

use crate::auth::UserStore;
use crate::config::AuthConfig;
use crate::test_support::*;

use axum::http::{Method, StatusCode};
use serde_json::json;

fn unauthorized_body() -> serde_json::Value {
    json!({ "error": "unauthorized", "message": "Unauthorized" })
}

#[tokio::test]
async fn test_login_returns_access_token_and_public_user() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["access_token"].is_string());
    assert_eq!(response.body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(response.body["user"]["role"], "ADMIN");
    assert!(response.body["user"].get("password").is_none());
    assert!(response.body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrongpassword" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_with_malformed_email_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "invalid-email", "password": "password123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
}

#[tokio::test]
async fn test_login_with_missing_field_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_access_token_replay_is_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let first = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["user"]["email"], ADMIN_EMAIL);

    let second = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(second.status, StatusCode::UNAUTHORIZED);
    assert_eq!(second.body, unauthorized_body());
}

#[tokio::test]
async fn test_protected_call_rotates_refresh_token() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let response = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    let refresh = response.refresh_header().unwrap();

    let user = app
        .sessions
        .tokens()
        .verifier(crate::auth::TokenKind::Refresh)
        .verify(&refresh)
        .unwrap();
    assert_eq!(user.email, ADMIN_EMAIL);
}

#[tokio::test]
async fn test_refresh_token_cannot_be_redeemed_twice() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let me = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    let refresh = me.refresh_header().unwrap();

    let first = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert!(first.body["access_token"].is_string());
    assert_eq!(first.body["user"]["email"], ADMIN_EMAIL);

    let second = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(second.status, StatusCode::UNAUTHORIZED);
    assert_eq!(second.body, unauthorized_body());
}

#[tokio::test]
async fn test_refresh_with_garbage_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": "invalid-refresh-token" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, unauthorized_body());
}

#[tokio::test]
async fn test_refresh_with_empty_token_is_unauthorized() {
    let app = TestApp::new().await;

    let empty = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": "" })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::UNAUTHORIZED);
    assert_eq!(empty.body, unauthorized_body());

    let missing = app
        .request(Method::POST, "/api/auth/refresh-token", None, Some(json!({})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_revokes_outstanding_refresh_tokens() {
    let app = TestApp::new().await;

    let token = app.admin_token().await;
    let me = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    let refresh = me.refresh_header().unwrap();

    let token = app.admin_token().await;
    let logout = app
        .request(Method::POST, "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logged out successfully");

    let user = app.users.find_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    assert!(user.refresh_tokens.is_empty());

    let response = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_and_malformed_bearer_look_the_same() {
    let app = TestApp::new().await;

    let missing = app.request(Method::GET, "/api/auth/me", None, None).await;
    let garbage = app
        .request(Method::GET, "/api/auth/me", Some("not.a.jwt"), None)
        .await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body, unauthorized_body());
    assert_eq!(garbage.body, missing.body);
    assert!(missing.refresh_header().is_none());
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let me = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    let refresh = me.refresh_header().unwrap();

    let response = app
        .request(Method::GET, "/api/auth/me", Some(&refresh), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_is_forbidden_but_still_rotated() {
    let app = TestApp::new().await;
    let token = app.user_token().await;

    let response = app
        .request(
            Method::DELETE,
            "/api/projects/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.refresh_header().is_some());

    // The token was spent by the rejected call
    let again = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rotation_can_be_disabled() {
    let config = AuthConfig {
        rotate_refresh_on_request: false,
        ..AuthConfig::for_tests()
    };
    let app = TestApp::with(config, RecordingMailer::default()).await;
    let token = app.admin_token().await;

    let response = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.refresh_header().is_none());
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}
