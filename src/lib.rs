//! Portfolio API
//!
//! REST backend for a developer portfolio:
//! - Public project listing with category/featured filters and sorting
//! - Admin-only project create, update and delete
//! - Argon2id password hashing
//! - Single-use JWT access tokens
//! - Refresh tokens that are consumed on use and rotated through the
//!   `X-Refresh-Token` response header
//! - Contact form delivered over SMTP
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables; see
//! [`config::AppConfig::from_env`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let pool = portfolio_api::db::connect(&config.database).await?;
//! portfolio_api::db::run_migrations(&pool).await?;
//!
//! let state = AppState::postgres(pool, &config)?;
//! axum::serve(listener, portfolio_api::create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod projects;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use auth::{AuthUser, SessionManager};
pub use config::{AppConfig, AuthConfig, ConfigError};
pub use error::{AuthError, ServiceError};

use auth::PgUserStore;
use contact::{Mailer, SmtpMailer};
use projects::{PgProjectStore, ProjectStore};

use axum::{routing::get, Json, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Errors raised while wiring the application together
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Shared handles for every route group
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub projects: Arc<dyn ProjectStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wire the PostgreSQL stores and SMTP mailer around one pool
    pub fn postgres(db: PgPool, config: &AppConfig) -> Result<Self, StartupError> {
        let users = Arc::new(PgUserStore::new(db.clone()));

        Ok(Self {
            sessions: Arc::new(SessionManager::new(users, config.auth.clone())?),
            projects: Arc::new(PgProjectStore::new(db)),
            mailer: Arc::new(SmtpMailer::new(&config.mail)?),
        })
    }
}

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::create_routes(state.sessions.clone()))
        .merge(projects::create_routes(
            state.projects.clone(),
            state.sessions.clone(),
        ))
        .merge(contact::create_routes(state.mailer.clone()));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
