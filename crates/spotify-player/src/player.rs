//! Search and playback calls against the Web API

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    uri: String,
    #[serde(default)]
    name: String,
}

/// Web API client for search and playback.
pub struct Player {
    http: reqwest::Client,
    api_base: String,
}

impl Player {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// URI of the first track the catalog returns for `query`.
    pub async fn search_track(&self, access_token: &str, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(Error::Search("query cannot be empty".into()));
        }

        let response = self
            .http
            .get(format!("{}/search", self.api_base))
            .query(&[("type", "track"), ("limit", "1"), ("q", query)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Search(format!("reading response body: {e}")))?;
        if status != StatusCode::OK {
            return Err(Error::Search(format!("{status}: {body}")));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Search(format!("decoding response: {e}")))?;
        let track = parsed
            .tracks
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoMatch(query.to_string()))?;

        debug!(query, uri = %track.uri, name = %track.name, "track found");
        Ok(track.uri)
    }

    /// Start `track_uri` on the active device. The API answers 204.
    pub async fn play_track(&self, access_token: &str, track_uri: &str) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/me/player/play", self.api_base))
            .bearer_auth(access_token)
            .json(&json!({ "uris": [track_uri] }))
            .send()
            .await
            .map_err(|e| Error::Playback(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Playback(format!("{status}: {body}")));
        }
        info!(uri = track_uri, "playback started");
        Ok(())
    }

    /// Resume whatever is loaded on the active device.
    pub async fn resume(&self, access_token: &str) -> Result<()> {
        self.control(access_token, "play").await
    }

    pub async fn pause(&self, access_token: &str) -> Result<()> {
        self.control(access_token, "pause").await
    }

    async fn control(&self, access_token: &str, action: &str) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/me/player/{action}", self.api_base))
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| Error::Playback(format!("{action}: {e}")))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                info!(action, "playback control applied");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Playback(format!("{action}: {status}: {body}")))
            }
        }
    }
}
