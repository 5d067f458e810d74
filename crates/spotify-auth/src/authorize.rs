//! Authorization URL and redirect target parsing

use std::net::SocketAddr;

use reqwest::Url;

use crate::client::ClientCredentials;
use crate::error::{Error, Result};

/// Build the URL the user's browser is sent to.
///
/// Parameters are appended in the order `client_id, response_type,
/// redirect_uri, state, scope`; scopes are space-joined before encoding.
pub fn build_authorization_url(endpoint: &str, credentials: &ClientCredentials) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| Error::RedirectUri(format!("invalid authorization endpoint {endpoint}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", &credentials.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &credentials.redirect_uri)
        .append_pair("state", &credentials.state)
        .append_pair("scope", &credentials.scope_string());
    Ok(url)
}

/// Where the local callback listener binds and which path it serves,
/// derived from the configured redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// `host:port` suitable for `TcpListener::bind`
    pub bind_addr: String,
    /// Path component, always starting with `/`
    pub path: String,
}

impl RedirectTarget {
    pub fn parse(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| Error::RedirectUri(format!("{redirect_uri}: {e}")))?;

        if url.scheme() != "http" {
            return Err(Error::RedirectUri(format!(
                "{redirect_uri}: loopback listener only serves plain http"
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::RedirectUri(format!("{redirect_uri}: missing host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::RedirectUri(format!("{redirect_uri}: missing port")))?;

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            bind_addr: format!("{host}:{port}"),
            path,
        })
    }
}

/// Redirect URI as the browser must use it once the listener is bound.
///
/// A configured port of 0 asks for an ephemeral port; the URI then carries
/// the port actually bound. Any other URI is returned unchanged.
pub fn bound_redirect_uri(redirect_uri: &str, local_addr: SocketAddr) -> Result<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| Error::RedirectUri(format!("{redirect_uri}: {e}")))?;
    if url.port() != Some(0) {
        return Ok(redirect_uri.to_string());
    }
    url.set_port(Some(local_addr.port()))
        .map_err(|_| Error::RedirectUri(format!("{redirect_uri}: cannot carry a port")))?;
    Ok(url.into())
}
