//! Authentication Middleware
//!
//! Bearer-token guards for protected routes. Each accepted request spends its
//! access token; when rotation is on, the replacement refresh token travels
//! back in the `X-Refresh-Token` response header.

use crate::auth::extractors::AuthUser;
use crate::auth::service::SessionManager;
use crate::error::AuthError;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Response header carrying a freshly rotated refresh token
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-refresh-token");

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

/// Validate the bearer token and record the caller on the request
async fn admit(
    sessions: &SessionManager,
    req: &mut Request,
) -> Result<(AuthUser, Option<String>), AuthError> {
    let token = bearer_token(req.headers())?.to_owned();
    let authenticated = sessions.authenticate(&token).await?;

    req.extensions_mut().insert(authenticated.user.clone());
    Ok((authenticated.user, authenticated.refresh_token))
}

fn with_refresh_header(mut response: Response, refresh_token: Option<String>) -> Response {
    if let Some(token) = refresh_token {
        match HeaderValue::from_str(&token) {
            Ok(value) => {
                response.headers_mut().insert(REFRESH_TOKEN_HEADER, value);
            }
            Err(e) => tracing::error!("Rotated refresh token is not a valid header: {:?}", e),
        }
    }
    response
}

/// Require a valid, unspent access token
pub async fn require_auth(
    State(sessions): State<Arc<SessionManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    match admit(&sessions, &mut req).await {
        Ok((_, refresh_token)) => with_refresh_header(next.run(req).await, refresh_token),
        Err(e) => e.into_response(),
    }
}

/// Require a valid, unspent access token held by an admin
pub async fn require_admin(
    State(sessions): State<Arc<SessionManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    let (user, refresh_token) = match admit(&sessions, &mut req).await {
        Ok(admitted) => admitted,
        Err(e) => return e.into_response(),
    };

    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, "Non-admin attempted admin route");
        // The token is already spent, so the caller still needs the rotated one
        return with_refresh_header(AuthError::Forbidden.into_response(), refresh_token);
    }

    with_refresh_header(next.run(req).await, refresh_token)
}
