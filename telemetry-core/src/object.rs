//! Telemetry object contract.
//!
//! A telemetry object accumulates the latest known state of one tracked
//! entity (a WSPR station, an rtl_433 sensor, ...). Objects are owned by the
//! registry; everything else sees them through `ObjectSnapshot`.
//!
//! State publication is not the object's business beyond calling the
//! `StateObserver` it was constructed with after every accepted message.

use std::sync::Arc;

use crate::message::TelemetryMessage;
use crate::types::{ExportedField, ObjectId, ObjectSnapshot, Result, Timestamp, Track};

/// Receives change notifications from telemetry objects.
pub trait StateObserver: Send + Sync {
    /// Exported field values of `object_id` changed.
    fn state_changed(&self, object_id: &str);

    /// The set of exported fields of `object_id` changed.
    fn shape_changed(&self, _object_id: &str) {}
}

/// Observer that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StateObserver for NullObserver {
    fn state_changed(&self, _object_id: &str) {}
}

/// Builds an empty object for a never-before-seen id.
pub type ObjectConstructor = fn(ObjectId, Arc<dyn StateObserver>) -> Box<dyn TelemetryObject>;

/// Per-entity state accumulator.
pub trait TelemetryObject: Send {
    fn object_id(&self) -> &str;

    /// Short name of the object kind, e.g. `"wspr_station"`.
    fn kind(&self) -> &'static str;

    /// Apply a message. On error the object is left exactly as it was.
    fn receive(&mut self, message: &TelemetryMessage) -> Result<()>;

    /// Whether this object is worth surfacing to observers.
    fn is_interesting(&self) -> bool {
        true
    }

    /// Time of the last accepted message, `None` before the first one.
    fn last_heard(&self) -> Option<Timestamp>;

    /// Seconds an object stays resident after it was last heard.
    fn retention(&self) -> f64;

    /// Absolute time at or after which the object is stale.
    ///
    /// An object that has never been heard is already stale.
    fn expiry(&self) -> Timestamp {
        match self.last_heard() {
            Some(t) => t + self.retention(),
            None => f64::NEG_INFINITY,
        }
    }

    fn track(&self) -> Track {
        Track::default()
    }

    fn exported_fields(&self) -> Vec<ExportedField>;

    fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            id: self.object_id().to_string(),
            kind: self.kind(),
            interesting: self.is_interesting(),
            last_heard: self.last_heard(),
            expiry: self.expiry(),
            track: self.track(),
            fields: self.exported_fields(),
        }
    }
}
