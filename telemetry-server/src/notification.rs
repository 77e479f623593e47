//! Webhook notification dispatch for object lifecycle events.
//!
//! Fire-and-forget HTTP POST of `ObjectEvent`s as JSON.

use serde_json::Value;
use tracing::warn;

use telemetry_core::registry::ObjectEvent;

/// Dispatches lifecycle events to a webhook URL via HTTP POST.
#[derive(Clone)]
pub struct WebhookDispatcher {
    url: String,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Self {
        WebhookDispatcher {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fire-and-forget POST of a lifecycle event as JSON.
    ///
    /// Per-message `Updated` events are not forwarded. Must be called from
    /// within a tokio runtime.
    pub fn notify(&self, event: &ObjectEvent) {
        if matches!(event, ObjectEvent::Updated { .. }) {
            return;
        }
        let payload = event_payload(event);
        let object_id = event.object_id().to_string();
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&payload).send().await {
                warn!(url = %url, object_id = %object_id, error = %e, "webhook POST failed");
            }
        });
    }
}

fn event_payload(event: &ObjectEvent) -> Value {
    serde_json::to_value(event).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_dispatcher_creation() {
        let wh = WebhookDispatcher::new("https://example.com/hook");
        assert_eq!(wh.url, "https://example.com/hook");
    }

    #[test]
    fn test_expired_event_payload() {
        let payload = event_payload(&ObjectEvent::Expired {
            object_id: "wsprspot_K1ABC_FN42".into(),
            timestamp: 1700000000.0,
        });

        assert_eq!(payload["event"], "expired");
        assert_eq!(payload["object_id"], "wsprspot_K1ABC_FN42");
        assert!(payload["timestamp"].as_f64().is_some());
    }

    #[test]
    fn test_created_event_payload() {
        let payload = event_payload(&ObjectEvent::Created {
            object_id: "2-LaCrosse-TX".into(),
            kind: "rtl_433_device",
            timestamp: 5.0,
        });

        assert_eq!(payload["event"], "created");
        assert_eq!(payload["kind"], "rtl_433_device");
    }

    #[tokio::test]
    async fn test_notify_does_not_block() {
        // Unroutable URL: the spawned POST fails and only logs.
        let wh = WebhookDispatcher::new("http://127.0.0.1:9/hook");
        wh.notify(&ObjectEvent::Expired {
            object_id: "x".into(),
            timestamp: 0.0,
        });
    }
}
