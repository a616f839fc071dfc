//! Password Hashing and Credential Verification

use crate::auth::models::UserResponse;
use crate::auth::store::UserStore;
use crate::config::HashingConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

/// Argon2id hasher with configured cost
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(config: &HashingConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh salt
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored PHC hash string
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("Stored password hash is unparsable: {:?}", e);
            AuthError::Internal
        })?;

        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Checks an email/password pair against the user store
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    hasher: Argon2Hasher,
    /// Verified against when the email is unknown, at the configured cost
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn UserStore>, hasher: Argon2Hasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash_password("unknown-account-placeholder")?;

        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    pub fn hasher(&self) -> &Argon2Hasher {
        &self.hasher
    }

    /// Unknown email and wrong password both yield `None`
    pub async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserResponse>, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            // Same Argon2 work as a real account so timing does not reveal the miss
            self.hasher.verify_password(password, &self.dummy_hash)?;
            return Ok(None);
        };

        if !self.hasher.verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        Ok(Some(UserResponse::from(user)))
    }
}
