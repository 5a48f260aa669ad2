//! Credential checks against the external identity provider's tokens.
//!
//! Sign-up, login and refresh happen at the provider; this service only
//! verifies the access token it issued and reads the principal out of it.

use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cookie the login flow stores the access token in.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Header carrying the shared secret of trusted internal callers.
pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User is not authenticated")]
    MissingCredentials,
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("service credentials rejected")]
    ServiceRejected,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

/// Claims read from the provider's token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.name,
        }
    }
}

pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match issuer {
            Some(iss) => validation.set_issuer(&[iss]),
            None => validation.iss = None,
        }
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims.into())
    }

    /// Authenticate whatever credential the request carries.
    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = credential_from_headers(headers).ok_or(AuthError::MissingCredentials)?;
        self.authenticate(&token)
    }
}

/// Bearer token from `Authorization`, falling back to the access-token cookie.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Shared-secret check for service-to-service endpoints.
///
/// With no configured token every caller is rejected.
pub struct ServiceAuth {
    token: Option<String>,
}

impl ServiceAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        match (&self.token, presented) {
            (Some(expected), Some(given))
                if constant_time_eq(expected.as_bytes(), given.as_bytes()) =>
            {
                Ok(())
            }
            _ => Err(AuthError::ServiceRejected),
        }
    }

    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        self.verify(
            headers
                .get(SERVICE_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok()),
        )
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
