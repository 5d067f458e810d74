//! Configuration errors shared across crates

use thiserror::Error;

/// Failure to read or validate the JSON config file.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_step() {
        assert_eq!(
            Error::Config("username is empty".into()).to_string(),
            "invalid configuration: username is empty"
        );

        let missing: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(missing.to_string().starts_with("reading config file:"), "{missing}");

        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse_err.into();
        assert!(err.to_string().starts_with("parsing config file:"), "{err}");
    }
}
