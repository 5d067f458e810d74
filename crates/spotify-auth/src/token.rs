//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (interactive flow completion)
//! 2. Token refresh (start of every run that has a persisted token)
//!
//! Both POST form-encoded bodies to the token endpoint, authenticating the
//! application with HTTP Basic client credentials.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClientCredentials;
use crate::error::{Error, Result};

/// Access/refresh token pair as persisted on disk.
///
/// `expires_in` is the delta reported by the provider; no absolute expiry is
/// stored, so staleness is only discovered by refreshing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token endpoint response for both grants.
///
/// Refresh responses commonly omit `refresh_token` to mean "unchanged".
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl TokenResponse {
    /// Convert into a `Token`, keeping `fallback_refresh` when the response
    /// carried no (or an empty) refresh token.
    pub fn into_token(self, fallback_refresh: &str) -> Token {
        let refresh_token = self
            .refresh_token
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| fallback_refresh.to_string());
        Token {
            access_token: self.access_token,
            refresh_token,
            expires_in: self.expires_in,
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

/// RFC 6749 error body (`{"error":"invalid_grant","error_description":"..."}`).
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_endpoint: &str,
    credentials: &ClientCredentials,
    code: &str,
) -> Result<Token> {
    let response = client
        .post(token_endpoint)
        .basic_auth(&credentials.client_id, Some(credentials.client_secret.expose()))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", credentials.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::TokenExchange(format!("request failed: {e}")))?;

    let token = read_token_response(response)
        .await
        .map_err(Error::TokenExchange)?
        .into_token("");
    debug!(scope = %token.scope, expires_in = token.expires_in, "authorization code exchanged");
    Ok(token)
}

/// Obtain a new access token from a refresh token.
///
/// The returned token always carries a refresh token: the provider's new one
/// if it sent one, otherwise `refresh`.
pub async fn refresh_token(
    client: &reqwest::Client,
    token_endpoint: &str,
    credentials: &ClientCredentials,
    refresh: &str,
) -> Result<Token> {
    let response = client
        .post(token_endpoint)
        .basic_auth(&credentials.client_id, Some(credentials.client_secret.expose()))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh)])
        .send()
        .await
        .map_err(|e| Error::Refresh(format!("request failed: {e}")))?;

    let token = read_token_response(response)
        .await
        .map_err(Error::Refresh)?
        .into_token(refresh);
    debug!(expires_in = token.expires_in, "access token refreshed");
    Ok(token)
}

/// Decode a token endpoint response, turning provider denials and
/// structurally empty tokens into an error message.
async fn read_token_response(response: reqwest::Response) -> std::result::Result<TokenResponse, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("reading token response: {e}"))?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ProviderError>(&body) {
            Ok(ProviderError {
                error,
                error_description: Some(description),
            }) => format!("token endpoint returned {status}: {error} ({description})"),
            Ok(ProviderError { error, .. }) => format!("token endpoint returned {status}: {error}"),
            Err(_) => format!("token endpoint returned {status}: {body}"),
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| format!("invalid token response: {e}"))?;
    if token.access_token.is_empty() {
        return Err("token response carried an empty access_token".into());
    }
    Ok(token)
}
