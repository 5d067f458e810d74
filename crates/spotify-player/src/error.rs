//! Error types for catalog and playback calls

/// Errors from the Web API. Every variant names the operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("search request failed: {0}")]
    Search(String),

    #[error("no track found for query: {0}")]
    NoMatch(String),

    #[error("playback request failed: {0}")]
    Playback(String),
}

/// Result alias for player operations.
pub type Result<T> = std::result::Result<T, Error>;
