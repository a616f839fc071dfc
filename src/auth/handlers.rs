//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::auth::extractors::{AuthUser, ValidatedJson};
use crate::auth::middleware;
use crate::auth::models::*;
use crate::auth::service::SessionManager;
use crate::error::AuthError;

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Shared session manager state
pub type AuthState = Arc<SessionManager>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(sessions: AuthState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token));

    // Protected routes (require an unspent access token)
    let protected = Router::new()
        .route("/auth/me", get(get_current_user))
        .route("/auth/logout", post(logout))
        .route_layer(axum_middleware::from_fn_with_state(
            sessions.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(sessions)
}

// ============================================
// Login / Logout
// ============================================

/// POST /auth/login
///
/// Authenticate user and return an access token
pub async fn login(
    State(sessions): State<AuthState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = sessions.login(&req.email, &req.password).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/logout
///
/// Revoke every refresh token held by the caller
pub async fn logout(
    State(sessions): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    sessions.invalidate_all(user.id).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

// ============================================
// Token Refresh
// ============================================

/// POST /auth/refresh-token
///
/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(sessions): State<AuthState>,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = sessions.refresh_tokens(&req.refresh_token).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// ============================================
// Current User
// ============================================

/// GET /auth/me
///
/// Get current authenticated user
pub async fn get_current_user(user: AuthUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "user": UserResponse {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }))
}
