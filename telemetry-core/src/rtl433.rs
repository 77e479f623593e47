//! rtl_433 JSON messages and the sensor devices they describe.
//!
//! rtl_433 reports whatever fields a device transmits, so a device group
//! keeps one dynamic cell per field instead of a fixed schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::message::TelemetryMessage;
use crate::object::{StateObserver, TelemetryObject};
use crate::types::*;

/// Devices are dropped this many seconds after their last message.
pub const GROUP_RETENTION: f64 = 120.0;

/// Fields that together identify a device, sorted by name.
///
/// Includes the legacy inconsistent names older rtl_433 versions emit.
const ID_COMPONENT_FIELDS: &[&str] = &[
    "channel", "dev_id", "device", "id", "model", "rc", "rid", "sid", "subtype", "type",
];

/// Fields that are neither identity nor worth exporting.
const IGNORED_FIELDS: &[&str] = &["mic", "time"];

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One parsed rtl_433 output record.
///
/// rtl_433 timestamps are file-relative when replaying captures, so the
/// local receive time is used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Rtl433Message {
    fields: Map<String, Value>,
    receive_time: Timestamp,
    object_id: ObjectId,
}

impl Rtl433Message {
    pub fn new(fields: Map<String, Value>, receive_time: Timestamp) -> Self {
        let object_id = ID_COMPONENT_FIELDS
            .iter()
            .filter_map(|k| fields.get(*k))
            .map(id_component)
            .collect::<Vec<_>>()
            .join("-");
        Rtl433Message {
            fields,
            receive_time,
            object_id,
        }
    }

    /// Parse one line of `rtl_433 -F json` output.
    pub fn from_json_line(line: &str, receive_time: Timestamp) -> Result<Self> {
        let value: Value = serde_json::from_str(line.trim()).map_err(|e| {
            TelemetryError::MalformedMessage(format!("bad JSON from rtl_433: {e}: {line:?}"))
        })?;
        match value {
            Value::Object(fields) => Ok(Rtl433Message::new(fields, receive_time)),
            other => Err(TelemetryError::MalformedMessage(format!(
                "rtl_433 record is not an object: {other}"
            ))),
        }
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn receive_time(&self) -> Timestamp {
        self.receive_time
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn validate(&self) -> Result<()> {
        if !self.receive_time.is_finite() {
            return Err(TelemetryError::MalformedMessage(format!(
                "receive time {} is not finite",
                self.receive_time
            )));
        }
        if self.object_id.is_empty() {
            return Err(TelemetryError::MalformedMessage(
                "rtl_433 record has no device identity fields".into(),
            ));
        }
        Ok(())
    }

    /// Fields that become cells on the device group.
    fn data_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields
            .iter()
            .filter(|(k, _)| !is_id_field(k) && !IGNORED_FIELDS.contains(&k.as_str()))
    }
}

fn is_id_field(key: &str) -> bool {
    ID_COMPONENT_FIELDS.contains(&key)
}

fn id_component(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Device group (object)
// ---------------------------------------------------------------------------

/// Latest reported value of every field one rtl_433 device has sent.
pub struct Rtl433Group {
    id: ObjectId,
    observer: Arc<dyn StateObserver>,
    cells: BTreeMap<String, Value>,
    last_heard: Option<Timestamp>,
}

impl Rtl433Group {
    pub fn new(id: ObjectId, observer: Arc<dyn StateObserver>) -> Self {
        Rtl433Group {
            id,
            observer,
            cells: BTreeMap::new(),
            last_heard: None,
        }
    }

    pub fn construct(id: ObjectId, observer: Arc<dyn StateObserver>) -> Box<dyn TelemetryObject> {
        Box::new(Rtl433Group::new(id, observer))
    }

    pub fn cell(&self, key: &str) -> Option<&Value> {
        self.cells.get(key)
    }

    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

impl TelemetryObject for Rtl433Group {
    fn object_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "rtl_433_device"
    }

    fn receive(&mut self, message: &TelemetryMessage) -> Result<()> {
        let msg = match message {
            TelemetryMessage::Rtl433(msg) => msg,
            other => {
                return Err(TelemetryError::MalformedMessage(format!(
                    "{} message cannot update rtl_433 device {}",
                    other.kind(),
                    self.id
                )))
            }
        };
        msg.validate()?;

        self.last_heard = Some(msg.receive_time);
        let mut shape_changed = false;
        for (k, v) in msg.data_fields() {
            if self.cells.insert(k.clone(), v.clone()).is_none() {
                shape_changed = true;
            }
        }
        self.observer.state_changed(&self.id);
        if shape_changed {
            self.observer.shape_changed(&self.id);
        }
        Ok(())
    }

    fn last_heard(&self) -> Option<Timestamp> {
        self.last_heard
    }

    fn retention(&self) -> f64 {
        GROUP_RETENTION
    }

    fn exported_fields(&self) -> Vec<ExportedField> {
        let mut fields: Vec<ExportedField> = self
            .cells
            .iter()
            .map(|(k, v)| ExportedField::new(k.as_str(), k.as_str(), None, v.clone()))
            .collect();
        fields.push(ExportedField::new(
            "last_heard_time",
            "Last heard",
            Some("s"),
            self.last_heard,
        ));
        fields
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
