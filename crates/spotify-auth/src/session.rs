//! Session manager: produce a usable access token for this run
//!
//! Acquisition prefers the cheapest strategy that works:
//! 1. Load the persisted token
//! 2. Refresh it (the stored access token is never trusted as-is, since no
//!    expiry timestamp is kept)
//! 3. Fall back to the interactive authorization-code flow
//!
//! Load and refresh failures are logged and fall through. An authorization
//! failure is returned to the caller: there is nothing left to try. Failing
//! to persist a new token only logs a warning, the token is still usable
//! in-memory for this run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authorize::{RedirectTarget, bound_redirect_uri, build_authorization_url};
use crate::callback::CallbackListener;
use crate::client::ClientCredentials;
use crate::constants::{AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use crate::error::{Error, Result};
use crate::store::TokenStore;
use crate::token::{self, Token};

/// Opens the authorization URL for the user.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the system's default browser.
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that_detached(url)
    }
}

/// Provider endpoints, overridable for tests.
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub authorize: String,
    pub token: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            authorize: AUTHORIZE_ENDPOINT.to_string(),
            token: TOKEN_ENDPOINT.to_string(),
        }
    }
}

/// Progress of one interactive authorization attempt.
///
/// A callback rejected for a state mismatch leaves the attempt in
/// `AwaitingCallback`; only `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPhase {
    Idle,
    ListenerStarted,
    BrowserOpened,
    AwaitingCallback,
    CallbackValidated,
    CodeExchanged,
    Complete,
    ExchangeFailed,
    Failed,
}

impl AuthorizationPhase {
    pub fn label(&self) -> &'static str {
        match self {
            AuthorizationPhase::Idle => "idle",
            AuthorizationPhase::ListenerStarted => "listener_started",
            AuthorizationPhase::BrowserOpened => "browser_opened",
            AuthorizationPhase::AwaitingCallback => "awaiting_callback",
            AuthorizationPhase::CallbackValidated => "callback_validated",
            AuthorizationPhase::CodeExchanged => "code_exchanged",
            AuthorizationPhase::Complete => "complete",
            AuthorizationPhase::ExchangeFailed => "exchange_failed",
            AuthorizationPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthorizationPhase::Complete | AuthorizationPhase::Failed)
    }
}

/// How `acquire` obtained its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Refreshed,
    Authorized,
}

/// A usable token plus where it came from.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Token,
    pub source: TokenSource,
}

/// Owns the OAuth credentials, the token file and the interactive flow.
pub struct SessionManager {
    credentials: ClientCredentials,
    endpoints: AuthEndpoints,
    http: reqwest::Client,
    store: TokenStore,
    opener: Arc<dyn UrlOpener>,
    callback_timeout: Option<Duration>,
    /// Held for the duration of an interactive attempt
    pending: Mutex<()>,
}

impl SessionManager {
    pub fn new(credentials: ClientCredentials, store: TokenStore, http: reqwest::Client) -> Self {
        Self {
            credentials,
            endpoints: AuthEndpoints::default(),
            http,
            store,
            opener: Arc::new(SystemBrowser),
            callback_timeout: None,
            pending: Mutex::new(()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Bound the browser wait. Without one, `authorize_interactively` waits
    /// until a valid callback arrives or the process is terminated.
    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return a usable token, refreshing or re-authorizing as needed, and
    /// persist whatever was obtained.
    pub async fn acquire(&self) -> Result<Session> {
        match self.store.load().await {
            Ok(persisted) if persisted.refresh_token.is_empty() => {
                warn!("persisted token has no refresh token, need to re-authenticate");
            }
            Ok(persisted) => match self.refresh(&persisted.refresh_token).await {
                Ok(token) => {
                    info!("refreshed persisted access token");
                    self.persist(&token).await;
                    return Ok(Session {
                        token,
                        source: TokenSource::Refreshed,
                    });
                }
                Err(e) => warn!(error = %e, "token refresh failed, need to re-authenticate"),
            },
            Err(e) => warn!(error = %e, "failed to load token, will need to re-authenticate"),
        }

        let token = self.authorize_interactively().await?;
        self.persist(&token).await;
        Ok(Session {
            token,
            source: TokenSource::Authorized,
        })
    }

    /// Exchange a refresh token for a new token. The result always carries a
    /// refresh token (the input one if the provider did not rotate it).
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        token::refresh_token(&self.http, &self.endpoints.token, &self.credentials, refresh_token)
            .await
    }

    /// Run the authorization-code flow through the user's browser.
    ///
    /// Only one attempt may be pending per manager; a concurrent call fails
    /// immediately.
    pub async fn authorize_interactively(&self) -> Result<Token> {
        let _pending = self
            .pending
            .try_lock()
            .map_err(|_| Error::Listener("an authorization attempt is already pending".into()))?;

        let mut phase = AuthorizationPhase::Idle;
        let target = RedirectTarget::parse(&self.credentials.redirect_uri)?;

        // Dropping the listener (error below or caller cancellation) stops it
        let listener = CallbackListener::bind(&target, &self.credentials.state).await?;
        phase = advance(phase, AuthorizationPhase::ListenerStarted);

        let redirect_uri = bound_redirect_uri(&self.credentials.redirect_uri, listener.local_addr())?;
        let credentials = self.credentials.clone().with_redirect_uri(redirect_uri);
        let url = build_authorization_url(&self.endpoints.authorize, &credentials)?;

        if let Err(e) = self.opener.open(url.as_str()) {
            warn!(error = %e, "failed to open browser, open the URL manually");
        }
        info!(url = %url, "Please authorize the application in your browser");
        phase = advance(phase, AuthorizationPhase::BrowserOpened);
        phase = advance(phase, AuthorizationPhase::AwaitingCallback);

        let code = match listener.wait(self.callback_timeout).await {
            Ok(code) => code,
            Err(e) => {
                advance(phase, AuthorizationPhase::Failed);
                return Err(e);
            }
        };
        phase = advance(phase, AuthorizationPhase::CallbackValidated);

        match token::exchange_code(&self.http, &self.endpoints.token, &credentials, &code)
            .await
        {
            Ok(token) => {
                phase = advance(phase, AuthorizationPhase::CodeExchanged);
                advance(phase, AuthorizationPhase::Complete);
                info!("authorization completed");
                Ok(token)
            }
            Err(e) => {
                phase = advance(phase, AuthorizationPhase::ExchangeFailed);
                advance(phase, AuthorizationPhase::Failed);
                Err(e)
            }
        }
    }

    async fn persist(&self, token: &Token) {
        if let Err(e) = self.store.save(token).await {
            warn!(path = %self.store.path().display(), error = %e, "failed to save token");
        }
    }
}

fn advance(from: AuthorizationPhase, to: AuthorizationPhase) -> AuthorizationPhase {
    debug!(from = from.label(), to = to.label(), "authorization phase");
    to
}
