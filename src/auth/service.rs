//! Session Manager
//!
//! Core authentication logic: login, refresh-token redemption, single-use
//! access-token validation with optional refresh-token rotation, and logout.
//!
//! A user moves from *anonymous* (no refresh tokens) to *active* (one or
//! more redeemable refresh tokens) and back to *revoked* through
//! [`SessionManager::invalidate_all`]. Each access token is *unused* until the
//! first time it is validated, after which it is *spent* for good.

use crate::auth::extractors::AuthUser;
use crate::auth::models::*;
use crate::auth::password::{Argon2Hasher, CredentialVerifier};
use crate::auth::store::UserStore;
use crate::auth::tokens::{TokenIssuer, TokenVerifier};
use crate::config::AuthConfig;
use crate::error::AuthError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a successful bearer-token check
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: AuthUser,
    /// Refresh token minted alongside the check, if rotation is enabled
    pub refresh_token: Option<String>,
}

/// Session manager
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    credentials: CredentialVerifier,
    tokens: TokenIssuer,
    config: AuthConfig,
    store_timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager over an injected store
    pub fn new(store: Arc<dyn UserStore>, config: AuthConfig) -> Result<Self, AuthError> {
        let hasher = Argon2Hasher::new(&config.hashing)?;

        Ok(Self {
            credentials: CredentialVerifier::new(store.clone(), hasher)?,
            tokens: TokenIssuer::new(&config),
            store_timeout: config.store_timeout(),
            store,
            config,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn hasher(&self) -> &Argon2Hasher {
        self.credentials.hasher()
    }

    async fn within_deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(operation, "Token store call timed out");
                Err(AuthError::Database(format!("{operation} timed out")))
            }
        }
    }

    fn auth_response(&self, access_token: String, user: UserResponse) -> AuthResponse {
        AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl(),
            user,
        }
    }

    // ============================================
    // Login
    // ============================================

    /// Exchange credentials for an access token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .within_deadline("find_by_email", self.credentials.verify(email, password))
            .await?
            .ok_or_else(|| {
                tracing::info!("Login rejected: invalid credentials");
                AuthError::InvalidCredentials
            })?;

        let access = self.tokens.issue_access_token(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, token_id = %access.token_id, "User logged in");

        Ok(self.auth_response(access.token, user))
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Sign a refresh token and record it for the user
    pub async fn issue_refresh_token(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let refresh = self.tokens.sign_refresh_token(user_id, email)?;

        let stored = self
            .within_deadline(
                "append_refresh_token",
                self.store.append_refresh_token(user_id, &refresh.token),
            )
            .await?;

        if !stored {
            return Err(AuthError::UserNotFound);
        }

        Ok(refresh.token)
    }

    /// Redeem a refresh token for a new access token. The presented token is
    /// removed from the user's list in the same step that checks it is there.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self
            .tokens
            .verifier(TokenKind::Refresh)
            .verify(refresh_token)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Refresh token failed verification");
                AuthError::InvalidRefreshToken
            })?;

        let user = self
            .within_deadline(
                "consume_refresh_token",
                self.store.consume_refresh_token(claims.sub, refresh_token),
            )
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = %claims.sub,
                    token_id = %claims.token_id,
                    "Refresh token is not redeemable (reused, revoked or unknown subject)"
                );
                AuthError::InvalidRefreshToken
            })?;

        let access = self.tokens.issue_access_token(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, token_id = %access.token_id, "Refresh token redeemed");

        Ok(self.auth_response(access.token, UserResponse::from(&user)))
    }

    // ============================================
    // Access Token Validation
    // ============================================

    /// Validate an access token and mark it spent
    pub async fn validate_access_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        Ok(self.spend(token, false).await?.user)
    }

    /// Validate an access token for an inbound request, minting a rotated
    /// refresh token in the same store update when rotation is enabled
    pub async fn authenticate(&self, token: &str) -> Result<Authenticated, AuthError> {
        self.spend(token, self.config.rotate_refresh_on_request).await
    }

    async fn spend(&self, token: &str, rotate: bool) -> Result<Authenticated, AuthError> {
        let claims = self.tokens.verifier(TokenKind::Access).verify(token)?;

        let rotated = if rotate {
            Some(self.tokens.sign_refresh_token(claims.sub, &claims.email)?)
        } else {
            None
        };

        let spent = self
            .within_deadline(
                "spend_access_token",
                self.store.spend_access_token(
                    claims.sub,
                    claims.token_id,
                    rotated.as_ref().map(|r| r.token.as_str()),
                ),
            )
            .await?;

        let Some(user) = spent else {
            return Err(self.classify_rejected_spend(&claims).await?);
        };

        tracing::debug!(user_id = %user.id, token_id = %claims.token_id, "Access token spent");

        Ok(Authenticated {
            user: AuthUser::from(&user),
            refresh_token: rotated.map(|r| r.token),
        })
    }

    async fn classify_rejected_spend(&self, claims: &TokenClaims) -> Result<AuthError, AuthError> {
        let user = self
            .within_deadline("find_by_id", self.store.find_by_id(claims.sub))
            .await?;

        Ok(match user {
            None => {
                tracing::warn!(user_id = %claims.sub, "Access token subject no longer exists");
                AuthError::UserNotFound
            }
            Some(_) => {
                tracing::warn!(
                    user_id = %claims.sub,
                    token_id = %claims.token_id,
                    "Access token replayed"
                );
                AuthError::TokenAlreadyUsed
            }
        })
    }

    // ============================================
    // Logout
    // ============================================

    /// Revoke every refresh token held by the user. Idempotent.
    pub async fn invalidate_all(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.within_deadline("clear_tokens", self.store.clear_tokens(user_id))
            .await?;

        tracing::info!(user_id = %user_id, "All refresh tokens revoked");
        Ok(())
    }

    // ============================================
    // Provisioning
    // ============================================

    /// Create or reset a user with the given role
    pub async fn provision_user(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserResponse, AuthError> {
        let password_hash = self.hasher().hash_password(password)?;
        let user = self
            .within_deadline(
                "upsert_user",
                self.store.upsert_user(email, &password_hash, role),
            )
            .await?;

        Ok(UserResponse::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryUserStore;
    use async_trait::async_trait;

    struct Fixture {
        sessions: SessionManager,
        store: Arc<MemoryUserStore>,
        user_id: Uuid,
    }

    async fn fixture_with(config: AuthConfig) -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let sessions = SessionManager::new(store.clone(), config).unwrap();
        let user = sessions
            .provision_user("test@example.com", "password123", UserRole::Admin)
            .await
            .unwrap();

        Fixture {
            sessions,
            store,
            user_id: user.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(AuthConfig::for_tests()).await
    }

    #[tokio::test]
    async fn test_login_returns_public_user() {
        let f = fixture().await;
        let response = f.sessions.login("test@example.com", "password123").await.unwrap();

        assert_eq!(response.user.id, f.user_id);
        assert_eq!(response.user.role, UserRole::Admin);
        assert_eq!(response.token_type, "Bearer");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["user"].get("password").is_none());
        assert!(json["user"].get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn test_invalid_login_stores_nothing() {
        let f = fixture().await;

        let err = f.sessions.login("test@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);

        let err = f.sessions.login("nobody@example.com", "password123").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert!(user.refresh_tokens.is_empty());
        assert!(user.used_token_ids.is_empty());
    }

    #[tokio::test]
    async fn test_access_token_is_single_use() {
        let f = fixture().await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        let user = f.sessions.validate_access_token(&login.access_token).await.unwrap();
        assert_eq!(user.id, f.user_id);
        assert_eq!(user.role, UserRole::Admin);

        assert_eq!(
            f.sessions.validate_access_token(&login.access_token).await.unwrap_err(),
            AuthError::TokenAlreadyUsed
        );
    }

    #[tokio::test]
    async fn test_authenticate_rotates_refresh_token() {
        let f = fixture().await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        let authenticated = f.sessions.authenticate(&login.access_token).await.unwrap();
        let refresh = authenticated.refresh_token.unwrap();

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert_eq!(user.refresh_tokens, vec![refresh]);
        assert_eq!(user.used_token_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_without_rotation() {
        let config = AuthConfig {
            rotate_refresh_on_request: false,
            ..AuthConfig::for_tests()
        };
        let f = fixture_with(config).await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        let authenticated = f.sessions.authenticate(&login.access_token).await.unwrap();
        assert!(authenticated.refresh_token.is_none());

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert!(user.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_replayed_access_token_does_not_rotate() {
        let f = fixture().await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        f.sessions.authenticate(&login.access_token).await.unwrap();
        assert!(f.sessions.authenticate(&login.access_token).await.is_err());

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert_eq!(user.refresh_tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let f = fixture().await;
        let refresh = f
            .sessions
            .issue_refresh_token(f.user_id, "test@example.com")
            .await
            .unwrap();

        let response = f.sessions.refresh_tokens(&refresh).await.unwrap();
        assert_eq!(response.user.email, "test@example.com");

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert!(!user.holds_refresh_token(&refresh));

        assert_eq!(
            f.sessions.refresh_tokens(&refresh).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
    }

    #[tokio::test]
    async fn test_refreshed_access_token_is_usable() {
        let f = fixture().await;
        let refresh = f
            .sessions
            .issue_refresh_token(f.user_id, "test@example.com")
            .await
            .unwrap();

        let response = f.sessions.refresh_tokens(&refresh).await.unwrap();
        assert!(f.sessions.validate_access_token(&response.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_validly_signed_but_unrecorded_refresh_token_rejected() {
        let f = fixture().await;
        let forged = f
            .sessions
            .tokens()
            .sign_refresh_token(f.user_id, "test@example.com")
            .unwrap();

        assert_eq!(
            f.sessions.refresh_tokens(&forged.token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage_and_access_tokens() {
        let f = fixture().await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        for token in ["invalid-refresh-token", login.access_token.as_str()] {
            assert_eq!(
                f.sessions.refresh_tokens(token).await.unwrap_err(),
                AuthError::InvalidRefreshToken
            );
        }
    }

    #[tokio::test]
    async fn test_refresh_for_unknown_subject_rejected() {
        let f = fixture().await;
        let orphan = f
            .sessions
            .tokens()
            .sign_refresh_token(Uuid::new_v4(), "ghost@example.com")
            .unwrap();

        assert_eq!(
            f.sessions.refresh_tokens(&orphan.token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
    }

    #[tokio::test]
    async fn test_invalidate_all_revokes_refresh_tokens() {
        let f = fixture().await;
        let first = f.sessions.issue_refresh_token(f.user_id, "test@example.com").await.unwrap();
        let second = f.sessions.issue_refresh_token(f.user_id, "test@example.com").await.unwrap();

        f.sessions.invalidate_all(f.user_id).await.unwrap();
        f.sessions.invalidate_all(f.user_id).await.unwrap();

        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert!(user.refresh_tokens.is_empty());

        for token in [first, second] {
            assert_eq!(
                f.sessions.refresh_tokens(&token).await.unwrap_err(),
                AuthError::InvalidRefreshToken
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_refresh_only_one_wins() {
        let f = fixture().await;
        let refresh = f
            .sessions
            .issue_refresh_token(f.user_id, "test@example.com")
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            f.sessions.refresh_tokens(&refresh),
            f.sessions.refresh_tokens(&refresh)
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AuthError::InvalidRefreshToken))));
    }

    #[tokio::test]
    async fn test_concurrent_spend_only_one_wins() {
        let f = fixture().await;
        let login = f.sessions.login("test@example.com", "password123").await.unwrap();

        let (a, b) = tokio::join!(
            f.sessions.authenticate(&login.access_token),
            f.sessions.authenticate(&login.access_token)
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let user = f.store.find_by_id(f.user_id).await.unwrap().unwrap();
        assert_eq!(user.refresh_tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_access_token_for_deleted_user() {
        let f = fixture().await;
        let stray = f
            .sessions
            .tokens()
            .issue_access_token(Uuid::new_v4(), "ghost@example.com")
            .unwrap();

        assert_eq!(
            f.sessions.validate_access_token(&stray.token).await.unwrap_err(),
            AuthError::UserNotFound
        );
    }

    #[tokio::test]
    async fn test_issue_refresh_token_for_unknown_user() {
        let f = fixture().await;
        assert_eq!(
            f.sessions
                .issue_refresh_token(Uuid::new_v4(), "ghost@example.com")
                .await
                .unwrap_err(),
            AuthError::UserNotFound
        );
    }

    /// Store whose reads never complete
    struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn find_by_email(&self, _: &str) -> Result<Option<User>, AuthError> {
            std::future::pending().await
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<User>, AuthError> {
            std::future::pending().await
        }
        async fn append_refresh_token(&self, _: Uuid, _: &str) -> Result<bool, AuthError> {
            std::future::pending().await
        }
        async fn consume_refresh_token(&self, _: Uuid, _: &str) -> Result<Option<User>, AuthError> {
            std::future::pending().await
        }
        async fn spend_access_token(
            &self,
            _: Uuid,
            _: Uuid,
            _: Option<&str>,
        ) -> Result<Option<User>, AuthError> {
            std::future::pending().await
        }
        async fn clear_tokens(&self, _: Uuid) -> Result<(), AuthError> {
            std::future::pending().await
        }
        async fn upsert_user(&self, _: &str, _: &str, _: UserRole) -> Result<User, AuthError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out_as_internal_error() {
        let config = AuthConfig {
            store_timeout_ms: 20,
            ..AuthConfig::for_tests()
        };
        let sessions = SessionManager::new(Arc::new(StalledStore), config).unwrap();

        let err = sessions.login("test@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, AuthError::Database(_)));
        assert!(!err.is_token_failure());
    }
}
