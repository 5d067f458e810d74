//! Spotify catalog search and playback control
//!
//! Thin client over the Web API endpoints the ambiance binary needs: find
//! the best track for a free-text query, start it on the user's active
//! device, and resume or pause whatever is loaded. Every call takes the
//! access token obtained from `spotify-auth`.

pub mod error;
pub mod player;

pub use error::{Error, Result};
pub use player::{API_BASE, Player};
