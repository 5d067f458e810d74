//! Group action calls with bounded retry

use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::state::LightState;

/// Linear backoff: after failed attempt `n` (1-based) the client sleeps
/// `n × backoff_step`, except after the final attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt`, or `None` when
    /// `attempt` was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.backoff_step * attempt)
    }
}

/// Client for one light group on one bridge.
pub struct HueClient {
    http: reqwest::Client,
    action_url: Url,
    retry: RetryPolicy,
}

impl HueClient {
    /// `bridge` is the bridge's address (`10.0.0.2`, `10.0.0.2:8080`) or a
    /// full base URL.
    pub fn new(http: reqwest::Client, bridge: &str, username: &str, group: &str) -> Result<Self> {
        let base = if bridge.starts_with("http://") || bridge.starts_with("https://") {
            bridge.trim_end_matches('/').to_string()
        } else {
            format!("http://{bridge}")
        };
        let mut action_url =
            Url::parse(&base).map_err(|e| Error::InvalidAddress(format!("{bridge}: {e}")))?;
        action_url
            .path_segments_mut()
            .map_err(|_| Error::InvalidAddress(format!("{bridge}: cannot be a base URL")))?
            .pop_if_empty()
            .extend(["api", username, "groups", group, "action"]);

        Ok(Self {
            http,
            action_url,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn action_url(&self) -> &Url {
        &self.action_url
    }

    /// PUT the state to the group action endpoint. Success is HTTP 200;
    /// anything else (or a transport error) is retried per the policy.
    pub async fn set_state(&self, state: &LightState) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.http.put(self.action_url.clone()).json(state).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    info!(attempt, on = state.on, bri = state.bri, xy = ?state.xy, "light state applied");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    format!("bridge returned {status} (attempt {attempt}): {body}")
                }
                Err(e) => format!("request failed (attempt {attempt}): {e}"),
            };

            match self.retry.delay_after(attempt) {
                Some(delay) => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %failure, "light state not applied, retrying");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    debug!(attempts = attempt, "lighting retries exhausted");
                    return Err(Error::Exhausted {
                        attempts: attempt,
                        last: failure,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::put;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Bridge {
        attempts: Arc<AtomicUsize>,
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
        /// Number of leading requests answered with 500
        failures: usize,
    }

    async fn action(
        State(bridge): State<Bridge>,
        axum::Json(body): axum::Json<serde_json::Value>,
    ) -> AxumStatus {
        let n = bridge.attempts.fetch_add(1, Ordering::SeqCst);
        bridge.bodies.lock().unwrap().push(body);
        if n < bridge.failures {
            AxumStatus::INTERNAL_SERVER_ERROR
        } else {
            AxumStatus::OK
        }
    }

    async fn start_bridge(bridge: Bridge) -> String {
        let app = Router::new()
            .route("/api/{user}/groups/{group}/action", put(action))
            .with_state(bridge);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr.to_string()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_millis(20),
        }
    }

    fn dim_warm() -> LightState {
        LightState {
            on: true,
            bri: 80,
            xy: Some([0.45, 0.41]),
        }
    }

    #[test]
    fn default_policy_backs_off_linearly_without_trailing_wait() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn action_url_from_bare_address() {
        let client = HueClient::new(reqwest::Client::new(), "10.0.0.2", "u", "1").unwrap();
        assert_eq!(client.action_url().as_str(), "http://10.0.0.2/api/u/groups/1/action");
    }

    #[test]
    fn action_url_from_base_url() {
        let client =
            HueClient::new(reqwest::Client::new(), "https://bridge.local/", "u", "3").unwrap();
        assert_eq!(client.action_url().as_str(), "https://bridge.local/api/u/groups/3/action");
    }

    #[test]
    fn rejects_unparseable_address() {
        assert!(matches!(
            HueClient::new(reqwest::Client::new(), "bad host name", "u", "1"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn puts_state_and_succeeds_on_200() {
        let bridge = Bridge::default();
        let addr = start_bridge(bridge.clone()).await;
        let client = HueClient::new(reqwest::Client::new(), &addr, "u", "1").unwrap();

        client.set_state(&dim_warm()).await.unwrap();

        assert_eq!(bridge.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            bridge.bodies.lock().unwrap()[0],
            serde_json::json!({"on": true, "bri": 80, "xy": [0.45, 0.41]})
        );
    }

    #[tokio::test]
    async fn retries_until_bridge_accepts() {
        let bridge = Bridge {
            failures: 2,
            ..Bridge::default()
        };
        let addr = start_bridge(bridge.clone()).await;
        let client = HueClient::new(reqwest::Client::new(), &addr, "u", "1")
            .unwrap()
            .with_retry(fast_retry());

        client.set_state(&dim_warm()).await.unwrap();
        assert_eq!(bridge.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_exactly_three_attempts() {
        let bridge = Bridge {
            failures: usize::MAX,
            ..Bridge::default()
        };
        let addr = start_bridge(bridge.clone()).await;
        let client = HueClient::new(reqwest::Client::new(), &addr, "u", "1")
            .unwrap()
            .with_retry(fast_retry());

        let started = Instant::now();
        let err = client.set_state(&dim_warm()).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            Error::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("500"), "last error should carry the status: {last}");
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(bridge.attempts.load(Ordering::SeqCst), 3);
        // 20ms + 40ms of backoff, none after the final attempt
        assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn unreachable_bridge_exhausts_retries() {
        let client = HueClient::new(reqwest::Client::new(), "127.0.0.1:1", "u", "1")
            .unwrap()
            .with_retry(fast_retry());
        assert!(matches!(
            client.set_state(&dim_warm()).await,
            Err(Error::Exhausted { attempts: 3, .. })
        ));
    }
}
