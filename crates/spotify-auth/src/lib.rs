//! Spotify OAuth session library
//!
//! Authorization-code flow with a loopback redirect listener, refresh grant,
//! and token file persistence. Used by the ambiance binary to obtain an
//! access token for the playback client.
//!
//! Token flow:
//! 1. `TokenStore::load()` reads the persisted token, if any
//! 2. `SessionManager::refresh()` trades its refresh token for a new one
//! 3. Otherwise `SessionManager::authorize_interactively()` starts a
//!    `CallbackListener`, opens the browser on `build_authorization_url()`
//!    and exchanges the returned code via `token::exchange_code()`
//! 4. `TokenStore::save()` overwrites the file with the result
//!
//! `SessionManager::acquire()` runs that policy end to end.

pub mod authorize;
pub mod callback;
pub mod client;
pub mod constants;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use authorize::{RedirectTarget, bound_redirect_uri, build_authorization_url};
pub use callback::CallbackListener;
pub use client::{ClientCredentials, generate_state};
pub use constants::*;
pub use error::{Error, Result};
pub use session::{
    AuthEndpoints, AuthorizationPhase, Session, SessionManager, SystemBrowser, TokenSource,
    UrlOpener,
};
pub use store::TokenStore;
pub use token::{Token, TokenResponse, exchange_code, refresh_token};
