//! Webhook notification dispatch for alert events.
//!
//! Fire-and-forget HTTP POST of alert events as JSON.

use serde_json::Value;

use squawk_core::types::AlertEvent;

/// Dispatches alert events to a webhook URL via HTTP POST.
#[derive(Clone)]
pub struct WebhookDispatcher {
    url: String,
    client: reqwest::Client,
}

/// JSON body posted for one event.
pub fn event_payload(event: &AlertEvent) -> Value {
    let f = &event.flight;
    serde_json::json!({
        "icao24": f.icao24,
        "event_type": event.kind,
        "callsign": f.callsign,
        "origin_country": f.origin_country,
        "squawk": f.squawk,
        "lat": f.latitude,
        "lon": f.longitude,
        "altitude_m": f.altitude_m,
    })
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Self {
        WebhookDispatcher {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fire-and-forget POST of an alert event as JSON.
    pub fn notify(&self, event: &AlertEvent) {
        let payload = event_payload(event);
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(%url, status = %resp.status(), "webhook rejected alert");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%url, error = %e, "webhook POST failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squawk_core::types::StateVector;

    #[test]
    fn test_webhook_dispatcher_creation() {
        let wh = WebhookDispatcher::new("https://example.com/hook");
        assert_eq!(wh.url, "https://example.com/hook");
    }

    #[test]
    fn test_event_payload() {
        let mut sv = StateVector::new("abc123", "United States");
        sv.squawk = Some("7700".into());
        sv.latitude = Some(35.5);

        let payload = event_payload(&AlertEvent::raised(sv.clone()));
        assert_eq!(payload["icao24"], "abc123");
        assert_eq!(payload["event_type"], "raised");
        assert_eq!(payload["squawk"], "7700");
        assert!(payload["lat"].as_f64().is_some());
        assert!(payload["lon"].is_null());

        let payload = event_payload(&AlertEvent::cleared(sv));
        assert_eq!(payload["event_type"], "cleared");
    }
}
