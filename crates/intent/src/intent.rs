//! Validated intent
//!
//! The model is asked for `{on, bri, xy, song_title, artist}` but nothing
//! guarantees it complies, so the raw payload is checked before anything is
//! sent to the bridge: `bri` must be an integer in 1..=254 and `xy`, when
//! present, exactly two finite numbers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Song reference extracted from the prompt. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl SongRequest {
    /// Catalog query: `"title artist"`, or whichever one is present.
    pub fn search_query(&self) -> String {
        match (&self.title, &self.artist) {
            (Some(title), Some(artist)) => format!("{title} {artist}"),
            (Some(title), None) => title.clone(),
            (None, Some(artist)) => artist.clone(),
            (None, None) => String::new(),
        }
    }
}

/// What the prompt asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub on: bool,
    pub brightness: u8,
    pub xy: Option<[f64; 2]>,
    pub song: Option<SongRequest>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    on: bool,
    bri: f64,
    #[serde(default)]
    xy: Option<Vec<f64>>,
    #[serde(default)]
    song_title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
}

impl Intent {
    /// Parse and validate the model's message content.
    pub fn from_model_output(content: &str) -> Result<Self> {
        let json = strip_code_fence(content);
        let raw: RawIntent = serde_json::from_str(json)
            .map_err(|e| Error::Response(format!("content is not an intent object: {e}, content: {content}")))?;
        raw.validate()
    }

    pub fn search_query(&self) -> Option<String> {
        self.song.as_ref().map(SongRequest::search_query)
    }
}

impl RawIntent {
    fn validate(self) -> Result<Intent> {
        if !self.bri.is_finite() || self.bri.fract() != 0.0 || !(1.0..=254.0).contains(&self.bri) {
            return Err(Error::Invalid(format!(
                "bri must be an integer between 1 and 254, got {}",
                self.bri
            )));
        }

        let xy = match self.xy {
            None => None,
            Some(values) => match values.as_slice() {
                [x, y] if x.is_finite() && y.is_finite() => Some([*x, *y]),
                _ => {
                    return Err(Error::Invalid(format!(
                        "xy must be two finite numbers, got {values:?}"
                    )));
                }
            },
        };

        let title = non_empty(self.song_title);
        let artist = non_empty(self.artist);
        let song = (title.is_some() || artist.is_some()).then_some(SongRequest { title, artist });

        Ok(Intent {
            on: self.on,
            brightness: self.bri as u8,
            xy,
            song,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Models sometimes wrap JSON in a Markdown fence despite instructions.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_intent() {
        let intent = Intent::from_model_output(
            r#"{"on":true,"bri":80,"xy":[0.45,0.41],"song_title":"Imagine","artist":"John Lennon"}"#,
        )
        .unwrap();
        assert!(intent.on);
        assert_eq!(intent.brightness, 80);
        assert_eq!(intent.xy, Some([0.45, 0.41]));
        assert_eq!(intent.search_query().as_deref(), Some("Imagine John Lennon"));
    }

    #[test]
    fn empty_song_fields_mean_no_song() {
        let intent = Intent::from_model_output(
            r#"{"on":true,"bri":254,"xy":[0.35,0.35],"song_title":"","artist":"  "}"#,
        )
        .unwrap();
        assert!(intent.song.is_none());
        assert!(intent.search_query().is_none());
    }

    #[test]
    fn query_uses_whichever_song_field_is_present() {
        let title_only =
            Intent::from_model_output(r#"{"on":true,"bri":10,"song_title":"Imagine"}"#).unwrap();
        assert_eq!(title_only.search_query().as_deref(), Some("Imagine"));

        let artist_only =
            Intent::from_model_output(r#"{"on":true,"bri":10,"artist":"Nina Simone"}"#).unwrap();
        assert_eq!(artist_only.search_query().as_deref(), Some("Nina Simone"));
    }

    #[test]
    fn missing_xy_keeps_color() {
        let intent = Intent::from_model_output(r#"{"on":false,"bri":1}"#).unwrap();
        assert!(!intent.on);
        assert_eq!(intent.xy, None);
    }

    #[test]
    fn rejects_out_of_range_brightness() {
        for bri in ["0", "255", "80.5", "-3"] {
            let content = format!(r#"{{"on":true,"bri":{bri}}}"#);
            assert!(
                matches!(Intent::from_model_output(&content), Err(Error::Invalid(_))),
                "bri {bri} must be rejected"
            );
        }
    }

    #[test]
    fn accepts_brightness_bounds() {
        assert_eq!(Intent::from_model_output(r#"{"on":true,"bri":1}"#).unwrap().brightness, 1);
        assert_eq!(Intent::from_model_output(r#"{"on":true,"bri":254.0}"#).unwrap().brightness, 254);
    }

    #[test]
    fn rejects_malformed_xy() {
        for xy in ["[0.3]", "[0.3,0.3,0.3]", "[]"] {
            let content = format!(r#"{{"on":true,"bri":100,"xy":{xy}}}"#);
            assert!(
                matches!(Intent::from_model_output(&content), Err(Error::Invalid(_))),
                "xy {xy} must be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_json_content() {
        assert!(matches!(
            Intent::from_model_output("Sure! Here are your lights."),
            Err(Error::Response(_))
        ));
    }

    #[test]
    fn unwraps_markdown_fence() {
        let intent =
            Intent::from_model_output("```json\n{\"on\":true,\"bri\":120,\"xy\":[0.3,0.3]}\n```")
                .unwrap();
        assert_eq!(intent.brightness, 120);
    }
}
