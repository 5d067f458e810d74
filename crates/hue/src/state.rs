//! Desired light state

use serde::Serialize;

/// Body of a group action request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightState {
    pub on: bool,
    /// Brightness, 1 (dimmest) to 254
    pub bri: u8,
    /// CIE 1931 chromaticity; omitted to keep the current color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_bridge_fields() {
        let state = LightState {
            on: true,
            bri: 80,
            xy: Some([0.45, 0.41]),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"on": true, "bri": 80, "xy": [0.45, 0.41]})
        );
    }

    #[test]
    fn omits_missing_color() {
        let state = LightState {
            on: false,
            bri: 1,
            xy: None,
        };
        assert_eq!(serde_json::to_string(&state).unwrap(), r#"{"on":false,"bri":1}"#);
    }
}
