//! Loopback listener for the authorization redirect
//!
//! Each `CallbackListener` owns its own axum router bound to the host:port
//! of the redirect URI, so several listeners (e.g. in tests) never share
//! routes. The handler resolves a single-use oneshot handoff:
//!
//! - `state` missing or different from the expected token: 400, not resolved
//! - valid `state` without `code`: 400, not resolved
//! - valid `state` with `error` (user denied): 400, resolves with `Denied`
//! - valid `state` with `code`: 200 success page, resolves with the code
//! - anything after the handoff resolved: 410, ignored
//!
//! Once resolved, the listener shuts itself down after a short grace period
//! so the browser receives the response first.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, oneshot};
use tracing::{debug, info, warn};

use crate::authorize::RedirectTarget;
use crate::constants::SHUTDOWN_GRACE;
use crate::error::{Error, Result};

type Handoff = Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    handoff: Handoff,
    shutdown: Arc<Notify>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// A pending authorization: one listener, one expected state, one handoff.
///
/// Dropping it before a callback resolved the handoff stops the server, so a
/// cancelled attempt never keeps the redirect port bound.
pub struct CallbackListener {
    local_addr: SocketAddr,
    outcome: oneshot::Receiver<Result<String>>,
    shutdown: Arc<Notify>,
    /// Set once the handoff delivered; shutdown is then on the grace timer
    resolved: bool,
}

impl CallbackListener {
    /// Bind the listener and start serving on a background task.
    pub async fn bind(target: &RedirectTarget, expected_state: &str) -> Result<Self> {
        let listener = TcpListener::bind(&target.bind_addr)
            .await
            .map_err(|e| Error::Listener(format!("binding {}: {e}", target.bind_addr)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Listener(format!("reading bound address: {e}")))?;

        let (tx, rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());
        let state = CallbackState {
            expected_state: Arc::from(expected_state),
            handoff: Arc::new(Mutex::new(Some(tx))),
            shutdown: shutdown.clone(),
        };
        let app = build_router(&target.path, state);

        let stop = shutdown.clone();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .await;
            match served {
                Ok(()) => debug!(addr = %local_addr, "callback listener stopped"),
                Err(e) => warn!(addr = %local_addr, error = %e, "callback listener failed"),
            }
        });

        info!(addr = %local_addr, path = %target.path, "callback listener started");
        Ok(Self {
            local_addr,
            outcome: rx,
            shutdown,
            resolved: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the first valid callback.
    ///
    /// `None` waits indefinitely: a browser that never completes the flow
    /// blocks the caller until the process is terminated. With a limit, the
    /// listener is shut down immediately when it expires.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<String> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.outcome).await {
                Ok(received) => received,
                Err(_) => return Err(Error::CallbackTimeout(limit)),
            },
            None => (&mut self.outcome).await,
        };

        match received {
            Ok(outcome) => {
                self.resolved = true;
                outcome
            }
            Err(_) => Err(Error::Listener(
                "listener stopped before a callback arrived".into(),
            )),
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if !self.resolved {
            debug!(addr = %self.local_addr, "releasing unresolved callback listener");
            self.shutdown.notify_one();
        }
    }
}

fn build_router(path: &str, state: CallbackState) -> Router {
    Router::new()
        .route(path, get(handle_callback))
        .with_state(state)
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if query.state.as_deref() != Some(&*state.expected_state) {
        warn!("rejected authorization callback with mismatched state");
        return page(
            StatusCode::BAD_REQUEST,
            "Authorization failed",
            "state mismatch",
        );
    }

    let outcome = match (query.error, query.code) {
        (Some(error), _) => Err(Error::Denied(error)),
        (None, Some(code)) if !code.is_empty() => Ok(code),
        _ => {
            warn!("authorization callback carried no code");
            return page(
                StatusCode::BAD_REQUEST,
                "Authorization failed",
                "missing authorization code",
            );
        }
    };

    let Some(sender) = state.handoff.lock().await.take() else {
        debug!("ignoring callback, authorization already resolved");
        return page(
            StatusCode::GONE,
            "Already authorized",
            "This authorization has already completed. You can close this tab.",
        );
    };

    let denied = outcome.is_err();
    // The receiver only disappears once the caller gave up waiting
    if sender.send(outcome).is_err() {
        debug!("authorization callback arrived after the caller stopped waiting");
    }
    schedule_shutdown(state.shutdown.clone(), SHUTDOWN_GRACE);

    if denied {
        page(
            StatusCode::BAD_REQUEST,
            "Authorization denied",
            "The request was not authorized. You can close this tab.",
        )
    } else {
        page(
            StatusCode::OK,
            "Authorization successful!",
            "You can close this tab.",
        )
    }
}

fn schedule_shutdown(shutdown: Arc<Notify>, grace: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        shutdown.notify_one();
    });
}

fn page(status: StatusCode, heading: &str, detail: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>ambiance</title></head>\n\
         <body style=\"font-family: system-ui; text-align: center; padding-top: 80px;\">\n\
         <h2>{heading}</h2>\n<p>{detail}</p>\n</body>\n</html>"
    );
    (status, Html(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn loopback() -> RedirectTarget {
        RedirectTarget {
            bind_addr: "127.0.0.1:0".into(),
            path: "/callback".into(),
        }
    }

    fn callback_url(listener: &CallbackListener, query: &str) -> String {
        format!("http://{}/callback?{query}", listener.local_addr())
    }

    #[tokio::test]
    async fn router_rejects_mismatched_state() {
        let (tx, mut rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: Arc::from("expected"),
            handoff: Arc::new(Mutex::new(Some(tx))),
            shutdown: Arc::new(Notify::new()),
        };
        let app = build_router("/callback", state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/callback?code=abc&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err(), "handoff must not resolve");
    }

    #[tokio::test]
    async fn router_serves_only_the_redirect_path() {
        let (tx, _rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: Arc::from("s"),
            handoff: Arc::new(Mutex::new(Some(tx))),
            shutdown: Arc::new(Notify::new()),
        };
        let app = build_router("/callback", state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/other?code=abc&state=s")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mismatched_state_returns_400_and_keeps_waiting() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();

        let response = reqwest::get(callback_url(&listener, "code=abc&state=wrong"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let result = listener.wait(Some(Duration::from_millis(200))).await;
        assert!(
            matches!(result, Err(Error::CallbackTimeout(_))),
            "wait must not resolve on a mismatched state, got {result:?}"
        );
    }

    #[tokio::test]
    async fn valid_callback_resolves_once() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();
        let first = callback_url(&listener, "code=first-code&state=expected");
        let second = callback_url(&listener, "code=second-code&state=expected");

        let response = reqwest::get(&first).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("Authorization successful"));

        // Browser retry arrives after the handoff was consumed
        let retry = reqwest::get(&second).await.unwrap();
        assert_eq!(retry.status(), reqwest::StatusCode::GONE);

        assert_eq!(listener.wait(None).await.unwrap(), "first-code");
    }

    #[tokio::test]
    async fn rejected_request_then_valid_request_resolves_with_valid_code() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();

        let forged = reqwest::get(callback_url(&listener, "code=evil&state=nope"))
            .await
            .unwrap();
        assert_eq!(forged.status(), reqwest::StatusCode::BAD_REQUEST);

        let valid = reqwest::get(callback_url(&listener, "code=good&state=expected"))
            .await
            .unwrap();
        assert_eq!(valid.status(), reqwest::StatusCode::OK);

        assert_eq!(listener.wait(None).await.unwrap(), "good");
    }

    #[tokio::test]
    async fn missing_code_is_rejected_without_resolving() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();

        let response = reqwest::get(callback_url(&listener, "state=expected"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        assert!(matches!(
            listener.wait(Some(Duration::from_millis(200))).await,
            Err(Error::CallbackTimeout(_))
        ));
    }

    #[tokio::test]
    async fn provider_error_resolves_with_denied() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();

        let response = reqwest::get(callback_url(&listener, "error=access_denied&state=expected"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        match listener.wait(None).await {
            Err(Error::Denied(reason)) => assert_eq!(reason, "access_denied"),
            other => panic!("expected Denied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listener_shuts_down_after_grace_period() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();
        let url = callback_url(&listener, "code=c&state=expected");

        reqwest::get(&url).await.unwrap();
        assert_eq!(listener.wait(None).await.unwrap(), "c");

        tokio::time::sleep(SHUTDOWN_GRACE + Duration::from_millis(500)).await;
        let fresh = reqwest::Client::new();
        assert!(
            fresh.get(&url).send().await.is_err(),
            "listener must be closed after the grace period"
        );
    }

    #[tokio::test]
    async fn timeout_shuts_listener_down() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();
        let url = callback_url(&listener, "code=late&state=expected");

        assert!(matches!(
            listener.wait(Some(Duration::from_millis(50))).await,
            Err(Error::CallbackTimeout(_))
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(reqwest::Client::new().get(&url).send().await.is_err());
    }

    #[tokio::test]
    async fn bind_failure_is_listener_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = RedirectTarget {
            bind_addr: occupied.local_addr().unwrap().to_string(),
            path: "/callback".into(),
        };
        assert!(matches!(
            CallbackListener::bind(&target, "s").await,
            Err(Error::Listener(_))
        ));
    }

    async fn assert_port_released(addr: SocketAddr) {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let rebound = TcpListener::bind(addr).await;
        assert!(rebound.is_ok(), "port still bound: {rebound:?}");
    }

    #[tokio::test]
    async fn dropping_listener_releases_port() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();
        let addr = listener.local_addr();

        drop(listener);
        assert_port_released(addr).await;
    }

    #[tokio::test]
    async fn cancelled_wait_releases_port() {
        let listener = CallbackListener::bind(&loopback(), "expected").await.unwrap();
        let addr = listener.local_addr();

        let cancelled = tokio::time::timeout(Duration::from_millis(50), listener.wait(None)).await;
        assert!(cancelled.is_err(), "no callback was sent");
        assert_port_released(addr).await;
    }
}
