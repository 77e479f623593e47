//! Background expiry sweep for a live registry.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use telemetry_core::registry::ObjectEvent;
use telemetry_core::{TelemetryRegistry, Timestamp};

use crate::notification::WebhookDispatcher;

pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// One sweep at `now`. Returns an `Expired` event per evicted object.
pub fn sweep_once(registry: &TelemetryRegistry, now: Timestamp) -> Vec<ObjectEvent> {
    registry
        .sweep_expired(now)
        .into_iter()
        .map(|object_id| ObjectEvent::Expired {
            object_id,
            timestamp: now,
        })
        .collect()
}

/// Sweep `registry` every `interval` until the returned task is aborted.
pub fn spawn_sweeper(
    registry: Arc<TelemetryRegistry>,
    interval: Duration,
    webhook: Option<WebhookDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for event in sweep_once(&registry, now()) {
                if let Some(wh) = &webhook {
                    wh.notify(&event);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_core::wspr::WsprSpot;
    use telemetry_core::NullObserver;

    fn spot(call: &str, time: f64) -> telemetry_core::TelemetryMessage {
        WsprSpot {
            call: Some(call.into()),
            grid: Some("FN20".into()),
            ..WsprSpot::new(time)
        }
        .into()
    }

    #[test]
    fn test_sweep_once_events() {
        let reg = TelemetryRegistry::new(Arc::new(NullObserver));
        reg.receive(&spot("OLD", 0.0)).unwrap();
        reg.receive(&spot("NEW", 10_000.0)).unwrap();

        let events = sweep_once(&reg, 5000.0);
        assert_eq!(
            events,
            vec![ObjectEvent::Expired {
                object_id: "wsprspot_OLD_FN20".into(),
                timestamp: 5000.0,
            }]
        );
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_stale_objects() {
        let reg = Arc::new(TelemetryRegistry::new(Arc::new(NullObserver)));
        reg.receive(&spot("STALE", 0.0)).unwrap();
        reg.receive(&spot("LIVE", now())).unwrap();

        let handle = spawn_sweeper(Arc::clone(&reg), Duration::from_millis(10), None);
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(!reg.contains("wsprspot_STALE_FN20"));
        assert!(reg.contains("wsprspot_LIVE_FN20"));
    }
}
