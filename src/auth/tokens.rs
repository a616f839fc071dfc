//! Token Issuing and Verification
//!
//! Access and refresh tokens are HS256 JWTs signed in two independent
//! contexts, each with its own secret and lifetime.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::auth::models::{TokenClaims, TokenKind};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

/// Verifies tokens of exactly one kind
pub trait TokenVerifier: Send + Sync {
    fn kind(&self) -> TokenKind;

    /// Check signature, expiry, issuer, audience and kind
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// A freshly signed token and the id embedded in it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
}

/// One signing context
pub struct TokenSigner {
    kind: TokenKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: i64,
    issuer: String,
    audience: String,
}

impl TokenSigner {
    pub fn new(kind: TokenKind, secret: &str, ttl: i64, issuer: &str, audience: &str) -> Self {
        Self {
            kind,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    /// Sign a token for a user with a new random token id
    pub fn sign(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        self.sign_at(user_id, email, Utc::now())
    }

    pub(crate) fn sign_at(
        &self,
        user_id: Uuid,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let exp = Duration::try_seconds(self.ttl)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                tracing::error!(kind = ?self.kind, ttl = self.ttl, "Token lifetime out of range");
                AuthError::Internal
            })?;

        let claims = TokenClaims {
            sub: user_id,
            email: email.to_string(),
            token_id: Uuid::new_v4(),
            typ: self.kind,
            iat: issued_at.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("JWT signing failed: {:?}", e);
                AuthError::Internal
            })?;

        Ok(IssuedToken {
            token,
            token_id: claims.token_id,
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;
        validation
    }
}

impl TokenVerifier for TokenSigner {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let token_data =
            decode::<TokenClaims>(token, &self.decoding_key, &self.validation()).map_err(|e| {
                tracing::debug!(kind = ?self.kind, "JWT validation failed: {:?}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenMalformed,
                }
            })?;

        if token_data.claims.typ != self.kind {
            tracing::debug!(expected = ?self.kind, got = ?token_data.claims.typ, "Token kind mismatch");
            return Err(AuthError::TokenMalformed);
        }

        Ok(token_data.claims)
    }
}

/// Mints and verifies both token kinds
pub struct TokenIssuer {
    access: TokenSigner,
    refresh: TokenSigner,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: TokenSigner::new(
                TokenKind::Access,
                &config.access_secret,
                config.access_token_expiration,
                &config.jwt_issuer,
                &config.jwt_audience,
            ),
            refresh: TokenSigner::new(
                TokenKind::Refresh,
                &config.refresh_secret,
                config.refresh_token_expiration,
                &config.jwt_issuer,
                &config.jwt_audience,
            ),
        }
    }

    /// Sign an access token
    pub fn issue_access_token(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        self.access.sign(user_id, email)
    }

    /// Sign a refresh token without recording it anywhere
    pub fn sign_refresh_token(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        self.refresh.sign(user_id, email)
    }

    pub fn signer(&self, kind: TokenKind) -> &TokenSigner {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn verifier(&self, kind: TokenKind) -> &dyn TokenVerifier {
        self.signer(kind)
    }

    /// Access token lifetime in seconds
    pub fn access_ttl(&self) -> i64 {
        self.access.ttl()
    }
}
