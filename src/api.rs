// VibraWatch — Remote API
//
// Wire records for the two endpoints and the transport capability they are
// sent over.  Transport-level failures (no Wi-Fi, connection refused, timeout)
// never surface as errors here: they are folded into the `-1` sentinel status.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::reading::SensorReading;
use crate::thresholds::ThresholdSet;

/// Status used when the request never reached the server.
pub const STATUS_NOT_CONNECTED: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: i32,
    pub body: String,
}

impl Response {
    pub fn new(status: i32, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn not_connected() -> Self {
        Self::new(STATUS_NOT_CONNECTED, "Not connected to WiFi")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_connected(&self) -> bool {
        self.status == STATUS_NOT_CONNECTED
    }
}

/// Connectivity plus a JSON POST to a path under the API base URL.
pub trait RemoteChannel {
    fn is_connected(&mut self) -> bool;

    /// Blocking reconnect attempt; success is observed via `is_connected`.
    fn reconnect(&mut self);

    /// Returns the `-1` sentinel when not connected or the transport fails.
    fn post_json(&mut self, path: &str, body: &str) -> Response;
}

// ---------------------------------------------------------------------------
// Outgoing payloads
// ---------------------------------------------------------------------------
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub serial: &'a str,
}

/// Body of a reading submission.  NaN fields serialise as JSON `null`.
#[derive(Debug, Serialize)]
pub struct ReadingReport<'a> {
    pub serial: &'a str,
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    pub lux: f64,
    #[serde(rename = "acelerometro_x")]
    pub accel_x: f64,
    #[serde(rename = "acelerometro_y")]
    pub accel_y: f64,
    #[serde(rename = "acelerometro_z")]
    pub accel_z: f64,
    #[serde(rename = "vibracao_media")]
    pub vibration: f64,
}

impl<'a> ReadingReport<'a> {
    pub fn new(serial: &'a str, reading: &SensorReading) -> Self {
        Self {
            serial,
            temperature: reading.temperature,
            lux: reading.lux,
            accel_x: reading.accel_x,
            accel_y: reading.accel_y,
            accel_z: reading.accel_z,
            vibration: reading.vibration,
        }
    }
}

// ---------------------------------------------------------------------------
// Registration response
// ---------------------------------------------------------------------------

/// Outer `Option` = key present, inner `Option` = value non-null.
type Field = Option<Option<f64>>;

fn present<'de, D>(deserializer: D) -> core::result::Result<Field, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Threshold fields of the `/init/` response.  Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ThresholdPayload {
    #[serde(default, deserialize_with = "present")]
    pub vibration_threshold_min: Field,
    #[serde(default, deserialize_with = "present")]
    pub vibration_threshold_max: Field,
    #[serde(default, deserialize_with = "present")]
    pub temperature_threshold_min: Field,
    #[serde(default, deserialize_with = "present")]
    pub temperature_threshold_max: Field,
    #[serde(default, deserialize_with = "present")]
    pub lux_threshold_min: Field,
    #[serde(default, deserialize_with = "present")]
    pub lux_threshold_max: Field,
}

impl ThresholdPayload {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    fn fields(&self) -> [Field; 6] {
        [
            self.vibration_threshold_min,
            self.vibration_threshold_max,
            self.temperature_threshold_min,
            self.temperature_threshold_max,
            self.lux_threshold_min,
            self.lux_threshold_max,
        ]
    }

    /// True if at least one threshold key appeared (even as `null`).
    pub fn has_thresholds(&self) -> bool {
        self.fields().iter().any(Option::is_some)
    }

    /// A complete replacement set; every missing or null key is unbounded.
    pub fn to_threshold_set(&self) -> ThresholdSet {
        ThresholdSet {
            vibration_min: self.vibration_threshold_min.flatten(),
            vibration_max: self.vibration_threshold_max.flatten(),
            temperature_min: self.temperature_threshold_min.flatten(),
            temperature_max: self.temperature_threshold_max.flatten(),
            lux_min: self.lux_threshold_min.flatten(),
            lux_max: self.lux_threshold_max.flatten(),
        }
    }
}

/// Append `chunk` to a response body without letting it grow past `cap`.
///
/// Keeps the prefix that still fits; returns `false` once the cap is hit.
pub fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(body.len());
    if chunk.len() > room {
        body.extend_from_slice(&chunk[..room]);
        return false;
    }
    body.extend_from_slice(chunk);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(201, "").is_success());
        assert!(!Response::new(301, "").is_success());
        assert!(!Response::new(503, "").is_success());
        assert!(!Response::not_connected().is_success());
        assert!(Response::not_connected().is_not_connected());
    }

    #[test]
    fn report_uses_wire_names_and_null_for_nan() {
        let reading = SensorReading {
            temperature: 25.5,
            lux: f64::NAN,
            accel_x: 0.0,
            accel_y: 0.25,
            accel_z: 1.0,
            gyro_x: 3.0,
            gyro_y: 3.0,
            gyro_z: 3.0,
            vibration: 0.5,
        };
        let json = serde_json::to_value(ReadingReport::new("ABC", &reading)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "serial": "ABC",
                "temperatura": 25.5,
                "lux": null,
                "acelerometro_x": 0.0,
                "acelerometro_y": 0.25,
                "acelerometro_z": 1.0,
                "vibracao_media": 0.5,
            })
        );
    }

    #[test]
    fn register_request_body() {
        let body = serde_json::to_string(&RegisterRequest { serial: "00AB" }).unwrap();
        assert_eq!(body, r#"{"serial":"00AB"}"#);
    }

    #[test]
    fn partial_payload_resets_other_bounds() {
        let payload = ThresholdPayload::parse(r#"{"temperature_threshold_max": 80}"#).unwrap();
        assert!(payload.has_thresholds());
        assert_eq!(
            payload.to_threshold_set(),
            ThresholdSet { temperature_max: Some(80.0), ..Default::default() }
        );
    }

    #[test]
    fn null_keys_count_as_thresholds() {
        let payload = ThresholdPayload::parse(
            r#"{"status":"success","vibration_threshold_min":null,"lux_threshold_min":12.5}"#,
        )
        .unwrap();
        assert!(payload.has_thresholds());
        let set = payload.to_threshold_set();
        assert_eq!(set.vibration_min, None);
        assert_eq!(set.lux_min, Some(12.5));
    }

    #[test]
    fn payload_without_threshold_keys() {
        let payload = ThresholdPayload::parse(r#"{"status":"success","message":"ok"}"#).unwrap();
        assert!(!payload.has_thresholds());
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(ThresholdPayload::parse("").is_err());
        assert!(ThresholdPayload::parse("not json").is_err());
        assert!(ThresholdPayload::parse(r#"{"lux_threshold_max":"bright"}"#).is_err());
    }

    #[test]
    fn body_chunks_within_cap_are_kept() {
        let mut body = Vec::new();
        assert!(append_capped(&mut body, b"{\"a\":", 16));
        assert!(append_capped(&mut body, b"1}", 16));
        assert_eq!(body, b"{\"a\":1}");
    }

    #[test]
    fn oversized_chunk_keeps_fitting_prefix() {
        let mut body = b"abcd".to_vec();
        assert!(!append_capped(&mut body, b"efghij", 8));
        assert_eq!(body, b"abcdefgh");
        assert!(!append_capped(&mut body, b"k", 8));
        assert_eq!(body.len(), 8);
    }
}
