//! Token verification and the `AuthUser` extractor.
//!
//! The identity provider is external; the gateway verifies the token it
//! issued and trusts the `(uid, role)` claims as given. Handlers take an
//! [`AuthUser`] argument to require authentication.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use relief_grid_core::{ActorId, Role};
use relief_grid_store::Store;

use crate::error::ApiError;
use crate::state::GatewayState;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors produced during token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is expired.
    #[error("token expired")]
    TokenExpired,

    /// The token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token carries a role outside the known set.
    #[error("unknown role claim: {0}")]
    UnknownRole(String),
}

/// Identity claims extracted from a verified token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// The subject uid.
    pub uid: ActorId,
    /// The claimed role.
    pub role: Role,
}

/// Trait for verifying bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and extract the identity claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or carries
    /// unusable claims.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// Claims layout of the identity provider's tokens.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    #[allow(dead_code)]
    exp: i64,
}

/// HS256 verifier for tokens signed with a shared secret.
pub struct HsVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HsVerifier {
    /// Create a verifier for the given shared secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenVerifier for HsVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            if matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            ) {
                AuthError::TokenExpired
            } else {
                AuthError::InvalidToken(e.to_string())
            }
        })?;

        let uid = ActorId::from_str(&data.claims.sub)
            .map_err(|_| AuthError::InvalidToken("empty subject".to_string()))?;
        let role = Role::from_str(&data.claims.role)
            .map_err(|_| AuthError::UnknownRole(data.claims.role.clone()))?;

        Ok(VerifiedIdentity { uid, role })
    }
}

/// Verifier for local development and tests.
///
/// Accepts tokens in the format `test-token:<uid>:<role>` and nothing else.
#[derive(Debug, Default)]
pub struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let rest = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("not a test token".to_string()))?;
        let (uid, role) = rest
            .split_once(':')
            .ok_or_else(|| AuthError::InvalidToken("missing role".to_string()))?;

        let uid = ActorId::from_str(uid)
            .map_err(|_| AuthError::InvalidToken("empty subject".to_string()))?;
        let role = Role::from_str(role).map_err(|_| AuthError::UnknownRole(role.to_string()))?;

        Ok(VerifiedIdentity { uid, role })
    }
}

/// An authenticated participant extracted from a bearer token.
///
/// This extractor validates the `Authorization: Bearer <token>` header
/// against the configured verifier.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The participant's uid.
    pub uid: ActorId,
    /// The role the participant acts under.
    pub role: Role,
}

impl<S, V> FromRequestParts<Arc<GatewayState<S, V>>> for AuthUser
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<S, V>>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let identity = state.verifier.verify(token).await?;

        Ok(Self {
            uid: identity.uid,
            role: identity.role,
        })
    }
}
