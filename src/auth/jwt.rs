//! HS256 bearer tokens for backend users

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthResult};
use crate::models::BackendUser;

/// Token payload; inserted into request extensions by the admin middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role_id: i64,
    #[serde(default)]
    pub role: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Claims for a fresh login, expiring after the configured TTL
    pub fn claims_for(&self, user: &BackendUser) -> Claims {
        let now = Utc::now();
        Claims {
            user_id: user.id,
            username: user.username.clone(),
            role_id: user.role_id,
            role: user.role_name.clone().unwrap_or_default(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn issue(&self, user: &BackendUser) -> AuthResult<String> {
        self.encode(&self.claims_for(user))
    }

    pub fn encode(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(AuthError::Issue)
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let value = header.ok_or(AuthError::MissingToken)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}
