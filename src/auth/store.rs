//! User Token Store
//!
//! Persistence for users and their token state. Every mutation of
//! `refresh_tokens` / `used_token_ids` is a single conditional row update, so
//! concurrent requests for the same user can never both observe and consume
//! the same token.

use crate::auth::models::{User, UserRole};
use crate::error::AuthError;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Storage collaborator for the session manager
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Append a refresh token; `false` if the user does not exist
    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, AuthError>;

    /// Remove `token` from the user's list if, and only if, it is present.
    /// Returns the updated user, or `None` when nothing was consumed.
    async fn consume_refresh_token(&self, id: Uuid, token: &str)
        -> Result<Option<User>, AuthError>;

    /// Record `token_id` as spent if it was not already, appending
    /// `rotated_refresh` in the same update. Returns `None` when the id was
    /// already spent or the user does not exist.
    async fn spend_access_token(
        &self,
        id: Uuid,
        token_id: Uuid,
        rotated_refresh: Option<&str>,
    ) -> Result<Option<User>, AuthError>;

    /// Drop every refresh token held by the user
    async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError>;

    /// Create the user or overwrite its password and role
    async fn upsert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AuthError>;
}

// ============================================
// PostgreSQL
// ============================================

/// `users` table backed store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                refresh_tokens = array_append(refresh_tokens, $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn consume_refresh_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET
                refresh_tokens = array_remove(refresh_tokens, $2),
                updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(refresh_tokens)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn spend_access_token(
        &self,
        id: Uuid,
        token_id: Uuid,
        rotated_refresh: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET
                used_token_ids = array_append(used_token_ids, $2),
                refresh_tokens = CASE
                    WHEN $3::TEXT IS NULL THEN refresh_tokens
                    ELSE array_append(refresh_tokens, $3::TEXT)
                END,
                updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(used_token_ids))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(token_id)
        .bind(rotated_refresh)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET refresh_tokens = '{}', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn upsert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }
}

// ============================================
// In-memory
// ============================================

/// Process-local store for tests and local development
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, AuthError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.refresh_tokens.push(token.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_refresh_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AuthError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if !user.holds_refresh_token(token) {
            return Ok(None);
        }

        user.refresh_tokens.retain(|t| t != token);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn spend_access_token(
        &self,
        id: Uuid,
        token_id: Uuid,
        rotated_refresh: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if user.has_spent(token_id) {
            return Ok(None);
        }

        user.used_token_ids.push(token_id);
        if let Some(token) = rotated_refresh {
            user.refresh_tokens.push(token.to_string());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_tokens.clear();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn upsert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        let now = Utc::now();

        if let Some(user) = users.values_mut().find(|u| u.email == email) {
            user.password_hash = password_hash.to_string();
            user.role = role;
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            refresh_tokens: Vec::new(),
            used_token_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
