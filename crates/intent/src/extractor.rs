//! Chat-completions call

use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::intent::Intent;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound for one extraction round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed instruction constraining the model to the intent schema.
pub const SYSTEM_PROMPT: &str = r#"You are an assistant that extracts lighting parameters and song information from user requests. Respond ONLY with a minified JSON object with these fields and no explanation: on (boolean, if the light is on or off), bri (integer, 1-254, brightness of the light), xy (array of two floats, color in CIE 1931 color space, e.g. [0.35,0.35]), song_title (string, the title of the song if mentioned, otherwise empty), artist (string, the artist of the song if mentioned, otherwise empty). Always use the field name "xy" as an array of two floats. Do not use "x" or "y" fields. Example: {"on":true,"bri":200,"xy":[0.35,0.35],"song_title":"Imagine","artist":"John Lennon"}. If ambiguous, default to {"on":true,"bri":254,"xy":[0.35,0.35],"song_title":"","artist":""}."#;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Language-model client turning prompts into intents.
pub struct IntentExtractor {
    http: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
}

impl IntentExtractor {
    pub fn new(http: reqwest::Client, api_key: Secret<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn extract(&self, prompt: &str) -> Result<Intent> {
        if self.api_key.is_blank() {
            return Err(Error::InvalidInput("API key is required".into()));
        }
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("prompt cannot be empty".into()));
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading response body: {e}")))?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Response(format!("{e}, body: {text}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Response(format!("no choices returned, body: {text}")))?;

        debug!(content = %content, "model answered");
        Intent::from_model_output(&content)
    }
}
