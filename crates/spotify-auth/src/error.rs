//! Error types for the Spotify OAuth session

use std::time::Duration;

/// Errors from token persistence, token endpoint calls and the interactive
/// authorization flow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("token file not found: {0}")]
    NotFound(String),

    #[error("token file decode error: {0}")]
    Decode(String),

    #[error("token persist failed: {0}")]
    Persist(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("invalid redirect URI: {0}")]
    RedirectUri(String),

    #[error("callback listener failed: {0}")]
    Listener(String),

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("no authorization callback received within {0:?}")]
    CallbackTimeout(Duration),
}

impl Error {
    /// Whether the caller can fall through to the next strategy instead of
    /// aborting (token load and refresh failures trigger re-authorization).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Decode(_) | Error::Refresh(_) | Error::Persist(_)
        )
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
