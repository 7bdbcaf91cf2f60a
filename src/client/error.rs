//! Client error types

use thiserror::Error;

/// Failure of a client call
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Request never produced a response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success status with a body that does not match the contract
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Reading or writing the persisted token failed
    #[error("session storage error: {0}")]
    Session(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status for server-side failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type alias for client calls
pub type ClientResult<T> = Result<T, ClientError>;
