//! One prompt, one run: extract → light → token → play

use std::sync::Arc;

use hue::{HueClient, LightState};
use intent::{Intent, IntentExtractor};
use spotify_auth::{AuthEndpoints, ClientCredentials, SessionManager, TokenStore, UrlOpener};
use spotify_player::Player;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

/// Base URLs of every collaborator.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub openai: String,
    pub spotify_api: String,
    pub spotify_auth: AuthEndpoints,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            openai: intent::OPENAI_BASE_URL.to_string(),
            spotify_api: spotify_player::API_BASE.to_string(),
            spotify_auth: AuthEndpoints::default(),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub intent: Intent,
    /// URI of the track started, if the prompt named a song
    pub played: Option<String>,
}

pub async fn run(
    config: &Config,
    prompt: &str,
    endpoints: &ServiceEndpoints,
    opener: Arc<dyn UrlOpener>,
) -> Result<RunSummary> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| common::Error::Config(format!("failed to build HTTP client: {e}")))?;

    let extractor = IntentExtractor::new(http.clone(), config.openai_api_key.clone())
        .with_base_url(&endpoints.openai)
        .with_model(&config.openai_model);
    let intent = extractor.extract(prompt).await?;
    info!(
        on = intent.on,
        bri = intent.brightness,
        xy = ?intent.xy,
        song = ?intent.search_query(),
        "received light state from language model"
    );

    let lights = HueClient::new(
        http.clone(),
        &config.bridge_ip,
        &config.username,
        &config.default_light,
    )?;
    lights
        .set_state(&LightState {
            on: intent.on,
            bri: intent.brightness,
            xy: intent.xy,
        })
        .await?;

    let credentials = ClientCredentials::new(
        &config.spotify_client_id,
        config.spotify_client_secret.clone(),
    )
    .with_redirect_uri(&config.spotify_redirect_uri);
    let sessions = SessionManager::new(
        credentials,
        TokenStore::new(&config.token_path),
        http.clone(),
    )
    .with_endpoints(endpoints.spotify_auth.clone())
    .with_opener(opener)
    .with_callback_timeout(config.callback_timeout);
    let session = sessions.acquire().await?;
    info!(source = ?session.source, "access token ready");

    let Some(query) = intent.search_query() else {
        info!("no song requested");
        return Ok(RunSummary {
            intent,
            played: None,
        });
    };

    let player = Player::new(http).with_api_base(&endpoints.spotify_api);
    let access_token = &session.token.access_token;
    let uri = player
        .search_track(access_token, &query)
        .await
        .map_err(Error::Search)?;
    player
        .play_track(access_token, &uri)
        .await
        .map_err(Error::Playback)?;
    info!(query = %query, uri = %uri, "playing track");

    Ok(RunSummary {
        intent,
        played: Some(uri),
    })
}
