//! Shared types, error enum, and exported-state snapshots for telemetry-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by telemetry-core.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid locator {locator:?}: unsupported length {len}")]
    InvalidLocatorFormat { locator: String, len: usize },
    #[error("invalid locator character {ch:?} at position {position}")]
    InvalidLocatorCharacter { ch: char, position: usize },
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    #[error("deletion of {0} is not permitted")]
    IllegalDeletion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Seconds since the Unix epoch.
pub type Timestamp = f64;

/// Stable key for a telemetry object, derived from message payload.
pub type ObjectId = String;

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// One observed value and when it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryItem {
    pub value: f64,
    pub timestamp: Timestamp,
}

impl TelemetryItem {
    pub fn new(value: f64, timestamp: Timestamp) -> Self {
        TelemetryItem { value, timestamp }
    }
}

/// Position of a telemetry object. Both halves are `None` until known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Track {
    pub latitude: Option<TelemetryItem>,
    pub longitude: Option<TelemetryItem>,
}

impl Track {
    pub fn at(lat: f64, lon: f64, timestamp: Timestamp) -> Self {
        Track {
            latitude: Some(TelemetryItem::new(lat, timestamp)),
            longitude: Some(TelemetryItem::new(lon, timestamp)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none()
    }
}

// ---------------------------------------------------------------------------
// Exported state
// ---------------------------------------------------------------------------

/// A single exported field of a telemetry object.
///
/// `value` is `null` while the field has never been observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedField {
    pub key: String,
    pub label: String,
    pub unit: Option<&'static str>,
    pub value: serde_json::Value,
}

impl ExportedField {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        unit: Option<&'static str>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        ExportedField {
            key: key.into(),
            label: label.into(),
            unit,
            value: value.into(),
        }
    }
}

/// Read-only view of one resident object, handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: &'static str,
    pub interesting: bool,
    pub last_heard: Option<Timestamp>,
    pub expiry: Timestamp,
    pub track: Track,
    pub fields: Vec<ExportedField>,
}

impl ObjectSnapshot {
    /// Look up an exported field by key.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_track() {
        let track = Track::default();
        assert!(track.is_empty());
        assert_eq!(serde_json::to_value(track).unwrap(), json!({"latitude": null, "longitude": null}));
    }

    #[test]
    fn test_track_at() {
        let track = Track::at(42.5, -83.0, 100.0);
        assert!(!track.is_empty());
        assert_eq!(track.latitude, Some(TelemetryItem::new(42.5, 100.0)));
        assert_eq!(track.longitude.unwrap().value, -83.0);
    }

    #[test]
    fn test_unknown_field_serializes_null() {
        let field = ExportedField::new("snr", "SNR", Some("dB"), Option::<i32>::None);
        assert_eq!(field.value, serde_json::Value::Null);
    }

    #[test]
    fn test_error_messages() {
        let err = TelemetryError::InvalidLocatorFormat {
            locator: "AA0".into(),
            len: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid locator \"AA0\": unsupported length 3"
        );
        let err = TelemetryError::IllegalDeletion("telemetry root".into());
        assert_eq!(err.to_string(), "deletion of telemetry root is not permitted");
    }
}
