//! telemetry-core: Pure tracking library for beacon and sensor telemetry.
//!
//! No async, no I/O beyond the config file: just the object registry, the
//! message/object models for WSPR and rtl_433, and Maidenhead locator
//! decoding. Shared by the `telemetry-server` CLI and HTTP surface.

pub mod config;
pub mod locator;
pub mod message;
pub mod object;
pub mod registry;
pub mod rtl433;
pub mod types;
pub mod wspr;

// Re-export commonly used types at crate root
pub use message::{MessageFormat, TelemetryMessage};
pub use object::{NullObserver, StateObserver, TelemetryObject};
pub use registry::{ObjectEvent, RegistryStats, TelemetryRegistry};
pub use types::*;
