//! Error types for bridge calls

/// Errors from the lighting client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid bridge address: {0}")]
    InvalidAddress(String),

    #[error("bridge rejected light state after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Result alias for lighting operations.
pub type Result<T> = std::result::Result<T, Error>;
