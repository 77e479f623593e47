//! WSPR spots and the stations they describe.
//!
//! A spot is one decode reported by `wsprd`. Spots sharing a callsign and
//! grid locator accumulate into one `WsprStation`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::locator;
use crate::message::TelemetryMessage;
use crate::object::{StateObserver, TelemetryObject};
use crate::types::*;

const MINUTES: f64 = 60.0;

/// Stations are dropped this many seconds after their last spot.
pub const STATION_RETENTION: f64 = 30.0 * MINUTES;

/// Placeholder `wsprd` prints when the callsign half of a two-part
/// transmission was missed.
const UNKNOWN_CALL: &str = "...";

// ---------------------------------------------------------------------------
// Spot (message)
// ---------------------------------------------------------------------------

/// One WSPR decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsprSpot {
    /// Start of the decode interval.
    pub time: Timestamp,
    pub snr: Option<i32>,
    /// Time offset in seconds.
    pub dt: Option<f64>,
    /// Frequency in MHz.
    pub frequency: Option<f64>,
    pub drift: Option<i32>,
    pub call: Option<String>,
    pub grid: Option<String>,
    /// Transmit power in dBm.
    pub txpower: Option<i32>,
}

impl WsprSpot {
    /// A spot with only its time known.
    pub fn new(time: Timestamp) -> Self {
        WsprSpot {
            time,
            snr: None,
            dt: None,
            frequency: None,
            drift: None,
            call: None,
            grid: None,
            txpower: None,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        format!(
            "wsprspot_{}_{}",
            self.call.as_deref().unwrap_or(""),
            self.grid.as_deref().unwrap_or("")
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time.is_finite() {
            return Err(malformed(format!("spot time {} is not finite", self.time)));
        }
        if let Some(f) = self.frequency.filter(|f| !f.is_finite()) {
            return Err(malformed(format!("spot frequency {f} is not finite")));
        }
        if let Some(dt) = self.dt.filter(|dt| !dt.is_finite()) {
            return Err(malformed(format!("spot dt {dt} is not finite")));
        }
        if let Some(grid) = &self.grid {
            locator::decode(grid).map_err(|e| malformed(format!("spot grid: {e}")))?;
        }
        Ok(())
    }

    /// Parse one `wsprd` output line.
    ///
    /// Format: `HHMM SNR DT FREQ DRIFT CALL GRID POWER`. wsprd does not know
    /// the date, so the caller passes the start time of the decoded interval.
    pub fn parse_wsprd_line(line: &str, decode_time: Timestamp) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 8 {
            return Err(malformed(format!(
                "expected 8 fields in wsprd line, got {}: {line:?}",
                tokens.len()
            )));
        }

        tokens[0]
            .parse::<u16>()
            .map_err(|_| malformed(format!("bad wsprd time field {:?}", tokens[0])))?;

        Ok(WsprSpot {
            time: decode_time,
            snr: Some(parse_field(tokens[1], "snr")?),
            dt: Some(parse_field(tokens[2], "dt")?),
            frequency: Some(parse_field(tokens[3], "frequency")?),
            drift: Some(parse_field(tokens[4], "drift")?),
            call: parse_call(tokens[5]),
            grid: Some(tokens[6].to_string()),
            txpower: Some(parse_field(tokens[7], "txpower")?),
        })
    }
}

fn malformed(reason: String) -> TelemetryError {
    TelemetryError::MalformedMessage(reason)
}

fn parse_field<T: std::str::FromStr>(token: &str, name: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| malformed(format!("bad wsprd {name} field {token:?}")))
}

/// `<CALL>` marks a hashed callsign from a two-part transmission; `<...>`
/// means the callsign is unknown.
fn parse_call(token: &str) -> Option<String> {
    let call = token
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    if call == UNKNOWN_CALL || call.is_empty() {
        None
    } else {
        Some(call.to_string())
    }
}

// ---------------------------------------------------------------------------
// Station (object)
// ---------------------------------------------------------------------------

/// Latest known state of one WSPR transmitter.
pub struct WsprStation {
    id: ObjectId,
    observer: Arc<dyn StateObserver>,
    last_heard: Option<Timestamp>,
    snr: Option<i32>,
    frequency: Option<f64>,
    call: Option<String>,
    grid: Option<String>,
    txpower: Option<i32>,
}

impl WsprStation {
    pub fn new(id: ObjectId, observer: Arc<dyn StateObserver>) -> Self {
        WsprStation {
            id,
            observer,
            last_heard: None,
            snr: None,
            frequency: None,
            call: None,
            grid: None,
            txpower: None,
        }
    }

    pub fn construct(id: ObjectId, observer: Arc<dyn StateObserver>) -> Box<dyn TelemetryObject> {
        Box::new(WsprStation::new(id, observer))
    }

    pub fn snr(&self) -> Option<i32> {
        self.snr
    }

    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    pub fn call(&self) -> Option<&str> {
        self.call.as_deref()
    }

    pub fn grid(&self) -> Option<&str> {
        self.grid.as_deref()
    }

    pub fn txpower(&self) -> Option<i32> {
        self.txpower
    }
}

impl TelemetryObject for WsprStation {
    fn object_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "wspr_station"
    }

    fn receive(&mut self, message: &TelemetryMessage) -> Result<()> {
        let spot = match message {
            TelemetryMessage::Wspr(spot) => spot,
            other => {
                return Err(malformed(format!(
                    "{} message cannot update WSPR station {}",
                    other.kind(),
                    self.id
                )))
            }
        };
        spot.validate()?;

        self.last_heard = Some(spot.time);
        self.snr = spot.snr;
        self.frequency = spot.frequency;
        self.call = spot.call.clone();
        self.grid = spot.grid.clone();
        self.txpower = spot.txpower;
        self.observer.state_changed(&self.id);
        Ok(())
    }

    fn last_heard(&self) -> Option<Timestamp> {
        self.last_heard
    }

    fn retention(&self) -> f64 {
        STATION_RETENTION
    }

    /// Centre of the station's grid cell, stamped with the last-heard time.
    fn track(&self) -> Track {
        let (Some(grid), Some(heard)) = (&self.grid, self.last_heard) else {
            return Track::default();
        };
        match locator::decode_center(grid) {
            Ok((lat, lon)) => Track::at(lat, lon, heard),
            Err(_) => Track::default(),
        }
    }

    fn exported_fields(&self) -> Vec<ExportedField> {
        vec![
            ExportedField::new("last_heard", "Last heard", Some("s"), self.last_heard),
            ExportedField::new("snr", "SNR", Some("dB"), self.snr),
            ExportedField::new("frequency", "Frequency", Some("MHz"), self.frequency),
            ExportedField::new("call", "Call", None, self.call.clone()),
            ExportedField::new("grid", "Grid", None, self.grid.clone()),
            ExportedField::new("txpower", "Tx Power", Some("dBm"), self.txpower),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
