//! Authentication
//!
//! Credential verification, token issuing, single-use access-token
//! enforcement and refresh-token rotation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use portfolio_api::auth::{MemoryUserStore, SessionManager};
//!
//! let sessions = SessionManager::new(Arc::new(MemoryUserStore::new()), config)?;
//! let login = sessions.login("admin@example.com", "admin123").await?;
//! let caller = sessions.validate_access_token(&login.access_token).await?;
//! ```

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod tokens;

#[cfg(test)]
mod flow_tests;

// Re-export commonly used types
pub use extractors::{AuthUser, ValidatedJson};
pub use handlers::{create_routes, AuthState};
pub use middleware::{require_admin, require_auth, REFRESH_TOKEN_HEADER};
pub use models::*;
pub use password::{Argon2Hasher, CredentialVerifier};
pub use service::{Authenticated, SessionManager};
pub use store::{MemoryUserStore, PgUserStore, UserStore};
pub use tokens::{IssuedToken, TokenIssuer, TokenSigner, TokenVerifier};
