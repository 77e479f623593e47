//! State observer that publishes object changes to the log.

use tracing::{debug, trace};

use telemetry_core::StateObserver;

/// Logs every state and shape change at trace/debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StateObserver for TracingObserver {
    fn state_changed(&self, object_id: &str) {
        trace!(object_id, "telemetry object state changed");
    }

    fn shape_changed(&self, object_id: &str) {
        debug!(object_id, "telemetry object gained fields");
    }
}
