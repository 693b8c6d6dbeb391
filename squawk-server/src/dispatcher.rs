//! Alert dispatch: the side-effect boundary.
//!
//! `Raised` events ring the audible cue and render a map; `Cleared` events
//! are only logged. Sink failures are logged and never stop the next event.
//! The scheduler hands events over through a bounded channel drained by
//! `spawn_worker`, so slow sinks never hold up polling.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use squawk_core::config::Route;
use squawk_core::types::{AlertEvent, AlertKind};

use crate::notification::WebhookDispatcher;
use crate::render::RenderSink;
use crate::sound::CueSink;

pub struct AlertDispatcher {
    cue: Arc<dyn CueSink>,
    renderer: Arc<dyn RenderSink>,
    cue_token: String,
    route: Option<Route>,
    webhook: Option<WebhookDispatcher>,
}

impl AlertDispatcher {
    pub fn new(
        cue: Arc<dyn CueSink>,
        renderer: Arc<dyn RenderSink>,
        cue_token: &str,
        route: Option<Route>,
    ) -> Self {
        AlertDispatcher {
            cue,
            renderer,
            cue_token: cue_token.to_string(),
            route,
            webhook: None,
        }
    }

    pub fn with_webhook(mut self, webhook: WebhookDispatcher) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn renderer(&self) -> &Arc<dyn RenderSink> {
        &self.renderer
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Run the side effects for one event. Never fails.
    pub async fn dispatch(&self, event: &AlertEvent) {
        let flight = &event.flight;

        if let Some(webhook) = &self.webhook {
            webhook.notify(event);
        }

        match event.kind {
            AlertKind::Raised => {
                tracing::warn!(
                    icao24 = %flight.icao24,
                    callsign = flight.callsign.as_deref().unwrap_or("-"),
                    country = %flight.origin_country,
                    "emergency squawk 7700 detected"
                );

                if let Err(e) = self.cue.play(&self.cue_token).await {
                    tracing::error!(icao24 = %flight.icao24, error = %e, "failed to play alert cue");
                }

                match self.renderer.render(flight, self.route.as_ref()).await {
                    Ok(path) => {
                        tracing::info!(icao24 = %flight.icao24, path = %path.display(), "map saved");
                    }
                    Err(e) => {
                        tracing::error!(icao24 = %flight.icao24, error = %e, "failed to render map");
                    }
                }
            }
            AlertKind::Cleared => {
                tracing::info!(
                    icao24 = %flight.icao24,
                    callsign = flight.callsign.as_deref().unwrap_or("-"),
                    "emergency cleared"
                );
            }
        }
    }
}

/// Drain `rx` until every sender is dropped, dispatching each event in order.
pub fn spawn_worker(
    dispatcher: Arc<AlertDispatcher>,
    mut rx: mpsc::Receiver<AlertEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            dispatcher.dispatch(&event).await;
        }
        tracing::debug!("alert dispatch worker finished");
    })
}

// ---------------------------------------------------------------------------
// Test sinks (shared with scheduler/monitor/web tests)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
