//! Client credentials and anti-forgery state
//!
//! `ClientCredentials` is fixed for the lifetime of a session manager. The
//! state token is generated once per instance and round-tripped through the
//! authorization redirect so the callback can be matched to this process.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use rand::RngExt;

use crate::constants::{DEFAULT_REDIRECT_URI, SCOPES};

/// Application credentials plus the per-session state token.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    /// Requested scopes, in order. Joined with spaces in the authorization URL.
    pub scopes: Vec<String>,
    pub state: String,
}

impl ClientCredentials {
    /// Credentials with the default loopback redirect, the playback scopes
    /// and a freshly generated state token.
    pub fn new(client_id: impl Into<String>, client_secret: Secret<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            state: generate_state(),
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Scopes in the wire form the authorization endpoint expects.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Generate a random anti-forgery state token.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 chars), so
/// the value survives the redirect without any escaping.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
