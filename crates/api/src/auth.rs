//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs issued by the storefront's identity service. The
//! API only verifies them and reads the subject and role.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;
use crate::error::ApiError;

/// Role granting access to management endpoints.
pub const ADMIN_ROLE: &str = "admin";

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject)
    pub sub: String,
    /// Role name, `admin` for administrators
    #[serde(default)]
    pub role: String,
    /// Expiry as a Unix timestamp
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

/// Verifies, and for tests and tooling issues, bearer tokens.
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

impl JwtAuth {
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Issues a token for `subject` with `role`, valid for `ttl`.
    pub fn issue(&self, subject: &str, role: &str, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header.
    pub fn token_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Fails with 403 unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, role = %self.role, "admin access denied");
            Err(ApiError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(identity.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = JwtAuth::token_from_header(header)
            .ok_or_else(|| ApiError::Unauthorized("Malformed authorization header".to_string()))?;

        let identity = match state.auth.verify(token) {
            Ok(claims) => Identity::from(claims),
            Err(e) => {
                tracing::warn!(error = %e, uri = %parts.uri, "bearer token rejected");
                return Err(ApiError::Unauthorized(e.to_string()));
            }
        };

        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}

/// Authenticated administrator. Rejects other callers with 403.
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        identity.require_admin()?;
        Ok(Admin(identity))
    }
}
