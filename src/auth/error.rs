//! Authentication error types

use thiserror::Error;

/// Errors raised while authenticating admin requests
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header on a protected request
    #[error("missing authorization header")]
    MissingToken,

    /// Header present but not `Bearer <token>`
    #[error("malformed authorization header, expected Bearer <token>")]
    MalformedHeader,

    /// Signature, format or claim check failed
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Token was well formed but its `exp` has passed
    #[error("token expired")]
    Expired,

    /// Signing a new token failed
    #[error("failed to issue token: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),

    /// Unknown username or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Account exists but is disabled
    #[error("account is disabled")]
    AccountDisabled,
}

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
