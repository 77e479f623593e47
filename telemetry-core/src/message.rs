//! Telemetry messages and the input formats they are parsed from.
//!
//! Each message variant knows which object it targets (`object_id`) and how
//! to build that object if it does not exist yet (`object_constructor`).

use std::str::FromStr;

use serde::Deserialize;

use crate::object::ObjectConstructor;
use crate::rtl433::{Rtl433Group, Rtl433Message};
use crate::types::{ObjectId, Result, TelemetryError, Timestamp};
use crate::wspr::{WsprSpot, WsprStation};

/// Union type for all telemetry messages.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    Wspr(WsprSpot),
    Rtl433(Rtl433Message),
}

impl TelemetryMessage {
    /// Key of the object this message updates.
    pub fn object_id(&self) -> ObjectId {
        match self {
            TelemetryMessage::Wspr(m) => m.object_id(),
            TelemetryMessage::Rtl433(m) => m.object_id().to_string(),
        }
    }

    /// Constructor for the target object kind.
    pub fn object_constructor(&self) -> ObjectConstructor {
        match self {
            TelemetryMessage::Wspr(_) => WsprStation::construct,
            TelemetryMessage::Rtl433(_) => Rtl433Group::construct,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            TelemetryMessage::Wspr(m) => m.time,
            TelemetryMessage::Rtl433(m) => m.receive_time(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryMessage::Wspr(_) => "wspr",
            TelemetryMessage::Rtl433(_) => "rtl_433",
        }
    }

    /// Check that the payload carries everything its target object needs.
    pub fn validate(&self) -> Result<()> {
        match self {
            TelemetryMessage::Wspr(m) => m.validate(),
            TelemetryMessage::Rtl433(m) => m.validate(),
        }
    }
}

impl From<WsprSpot> for TelemetryMessage {
    fn from(spot: WsprSpot) -> Self {
        TelemetryMessage::Wspr(spot)
    }
}

impl From<Rtl433Message> for TelemetryMessage {
    fn from(msg: Rtl433Message) -> Self {
        TelemetryMessage::Rtl433(msg)
    }
}

// ---------------------------------------------------------------------------
// Input formats
// ---------------------------------------------------------------------------

/// Line-oriented decoder output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// `wsprd` spot lines: `HHMM SNR DT FREQ DRIFT CALL GRID POWER`.
    #[serde(alias = "wspr")]
    Wsprd,
    /// `rtl_433 -F json` output, one JSON object per line.
    #[serde(alias = "rtl_433")]
    Rtl433,
}

impl MessageFormat {
    /// Parse one decoder output line received at `timestamp`.
    pub fn parse_line(self, line: &str, timestamp: Timestamp) -> Result<TelemetryMessage> {
        match self {
            MessageFormat::Wsprd => WsprSpot::parse_wsprd_line(line, timestamp).map(Into::into),
            MessageFormat::Rtl433 => Rtl433Message::from_json_line(line, timestamp).map(Into::into),
        }
    }
}

impl FromStr for MessageFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wsprd" | "wspr" => Ok(MessageFormat::Wsprd),
            "rtl433" | "rtl_433" => Ok(MessageFormat::Rtl433),
            other => Err(TelemetryError::Config(format!(
                "unknown message format {other:?} (expected wsprd or rtl433)"
            ))),
        }
    }
}

impl std::fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageFormat::Wsprd => write!(f, "wsprd"),
            MessageFormat::Rtl433 => write!(f, "rtl433"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wspr_routing() {
        let msg: TelemetryMessage = WsprSpot {
            call: Some("WA7MOX".into()),
            grid: Some("EL16".into()),
            ..WsprSpot::new(10.0)
        }
        .into();
        assert_eq!(msg.object_id(), "wsprspot_WA7MOX_EL16");
        assert_eq!(msg.kind(), "wspr");
        assert_eq!(msg.timestamp(), 10.0);

        let obj = (msg.object_constructor())(msg.object_id(), std::sync::Arc::new(crate::object::NullObserver));
        assert_eq!(obj.kind(), "wspr_station");
    }

    #[test]
    fn test_rtl433_routing() {
        let msg = MessageFormat::Rtl433
            .parse_line(r#"{"model": "LaCrosse-TX", "id": 2, "temperature_C": 30.4}"#, 5.0)
            .unwrap();
        assert_eq!(msg.object_id(), "2-LaCrosse-TX");
        assert_eq!(msg.timestamp(), 5.0);

        let obj = (msg.object_constructor())(msg.object_id(), std::sync::Arc::new(crate::object::NullObserver));
        assert_eq!(obj.kind(), "rtl_433_device");
    }

    #[test]
    fn test_parse_wsprd_line() {
        let msg = MessageFormat::Wsprd
            .parse_line("2322 -21  1.5   14.097110  -1  WA7MOX EL16 33", 100.0)
            .unwrap();
        assert!(matches!(msg, TelemetryMessage::Wspr(ref s) if s.call.as_deref() == Some("WA7MOX")));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("wsprd".parse::<MessageFormat>().unwrap(), MessageFormat::Wsprd);
        assert_eq!("RTL_433".parse::<MessageFormat>().unwrap(), MessageFormat::Rtl433);
        assert!("ais".parse::<MessageFormat>().is_err());
    }

    #[test]
    fn test_format_deserialize() {
        let f: MessageFormat = serde_json::from_str("\"rtl433\"").unwrap();
        assert_eq!(f, MessageFormat::Rtl433);
        assert_eq!(f.to_string(), "rtl433");
    }

    #[test]
    fn test_format_names_agree() {
        for name in ["wsprd", "wspr", "rtl433", "rtl_433"] {
            let parsed: MessageFormat = name.parse().unwrap();
            let deserialized: MessageFormat = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, deserialized, "{name}");
        }
    }
}
