//! Pipeline errors, one variant per stage

use thiserror::Error;

/// A failed run. The variant names the stage that stopped it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] common::Error),

    #[error("intent extraction failed: {0}")]
    Extraction(#[from] intent::Error),

    #[error("lighting failed: {0}")]
    Lighting(#[from] hue::Error),

    #[error("authorization failed: {0}")]
    Authorization(#[from] spotify_auth::Error),

    #[error("track search failed: {0}")]
    Search(spotify_player::Error),

    #[error("playback failed: {0}")]
    Playback(spotify_player::Error),
}

impl Error {
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Extraction(_) => "extraction",
            Error::Lighting(_) => "lighting",
            Error::Authorization(_) => "authorization",
            Error::Search(_) => "search",
            Error::Playback(_) => "playback",
        }
    }
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
