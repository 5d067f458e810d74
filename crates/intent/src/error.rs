//! Error types for intent extraction

/// Errors from the language-model call or from validating its answer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("language model request failed: {0}")]
    Http(String),

    #[error("language model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected language model response: {0}")]
    Response(String),

    #[error("intent rejected: {0}")]
    Invalid(String),
}

/// Result alias for extraction.
pub type Result<T> = std::result::Result<T, Error>;
