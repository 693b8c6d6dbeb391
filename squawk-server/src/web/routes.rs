//! REST API route handlers.
//!
//! Thin wrappers over `Monitor`: control endpoints map `MonitorError` to
//! 409, lookups map `NotFound` to 404 and feed failures to 502. A render of
//! a flight without a position is 422; a failed write is 500.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use squawk_core::types::{LookupError, RenderError, StateVector};

use crate::web::AppState;

fn lookup_error_response(e: LookupError) -> Response {
    let status = match e {
        LookupError::NotFound(_) => StatusCode::NOT_FOUND,
        LookupError::Fetch(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

// ---------------------------------------------------------------------------
// Monitor control
// ---------------------------------------------------------------------------

/// GET /api/monitor: scheduler status.
pub async fn api_monitor_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.status().await)
}

/// POST /api/monitor/start
pub async fn api_monitor_start(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.start_monitoring().await {
        Ok(()) => Json(state.monitor.status().await).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

/// POST /api/monitor/stop
pub async fn api_monitor_stop(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.stop_monitoring().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Emergencies + flights
// ---------------------------------------------------------------------------

/// GET /api/emergencies: aircraft currently in emergency.
pub async fn api_emergencies(State(state): State<Arc<AppState>>) -> Json<Vec<StateVector>> {
    Json(state.monitor.list_current_emergencies())
}

/// GET /api/flights/:icao24: one-shot lookup against the live feed.
pub async fn api_flight(
    State(state): State<Arc<AppState>>,
    Path(icao24): Path<String>,
) -> Response {
    match state.monitor.lookup_flight(&icao24).await {
        Ok(sv) => Json(sv).into_response(),
        Err(e) => lookup_error_response(e),
    }
}

/// POST /api/flights/:icao24/render: look up and render a map.
pub async fn api_flight_render(
    State(state): State<Arc<AppState>>,
    Path(icao24): Path<String>,
) -> Response {
    let flight = match state.monitor.lookup_flight(&icao24).await {
        Ok(sv) => sv,
        Err(e) => return lookup_error_response(e),
    };

    match state.monitor.render_flight(&flight).await {
        Ok(path) => Json(json!({
            "icao24": flight.icao24,
            "path": path.display().to_string(),
        }))
        .into_response(),
        Err(e) => {
            let status = match e {
                RenderError::NoPosition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                RenderError::Io(_) => {
                    tracing::error!(icao24 = %flight.icao24, error = %e, "map render failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::dispatcher::testing::recording_dispatcher;
    use crate::feed::testing::{snapshot_of, squawking, ScriptedFeed};
    use crate::monitor::Monitor;
    use crate::scheduler::ScheduleConfig;
    use squawk_core::types::FetchError;

    fn test_state(feed: ScriptedFeed) -> Arc<AppState> {
        test_state_with(feed, false)
    }

    fn test_state_with(feed: ScriptedFeed, render_fail: bool) -> Arc<AppState> {
        let (dispatcher, _, _) = recording_dispatcher(false, render_fail);
        let monitor = Monitor::new(Arc::new(feed), dispatcher, ScheduleConfig::default(), 8);
        Arc::new(AppState {
            monitor: Arc::new(monitor),
        })
    }

    fn default_feed() -> ScriptedFeed {
        let mut parked = squawking("def456", "1200");
        parked.latitude = None;
        parked.longitude = None;
        ScriptedFeed::fixed(snapshot_of(vec![squawking("abc123", "7700"), parked]))
    }

    async fn send(state: &Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Value) {
        let app = crate::web::build_router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_api_monitor_idle() {
        let state = test_state(default_feed());
        let (status, json) = send(&state, "GET", "/api/monitor").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "idle");
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_monitor_lifecycle() {
        let state = test_state(default_feed());

        let (status, json) = send(&state, "POST", "/api/monitor/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "running");

        let (status, _) = send(&state, "POST", "/api/monitor/start").await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Let the first cycle run
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let (status, json) = send(&state, "GET", "/api/emergencies").await;
        assert_eq!(status, StatusCode::OK);
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["icao24"], "abc123");

        let (status, json) = send(&state, "POST", "/api/monitor/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "stopped");

        let (status, _) = send(&state, "POST", "/api/monitor/stop").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_api_emergencies_empty_before_start() {
        let state = test_state(default_feed());
        let (status, json) = send(&state, "GET", "/api/emergencies").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_flight() {
        let state = test_state(default_feed());
        let (status, json) = send(&state, "GET", "/api/flights/abc123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["icao24"], "abc123");
        assert_eq!(json["squawk"], "7700");
    }

    #[tokio::test]
    async fn test_api_flight_not_found() {
        let state = test_state(default_feed());
        let (status, json) = send(&state, "GET", "/api/flights/zzz999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("zzz999"));
    }

    #[tokio::test]
    async fn test_api_flight_feed_down() {
        let feed = ScriptedFeed::new(vec![]).with_fallback(Err(FetchError::HttpStatus(503)));
        let state = test_state(feed);
        let (status, _) = send(&state, "GET", "/api/flights/abc123").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_api_flight_render() {
        let state = test_state(default_feed());
        let (status, json) = send(&state, "POST", "/api/flights/abc123/render").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["path"], "flight_abc123.html");

        let (status, _) = send(&state, "POST", "/api/flights/def456/render").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_api_flight_render_write_failure() {
        let state = test_state_with(default_feed(), true);
        let (status, json) = send(&state, "POST", "/api/flights/abc123/render").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("disk full"));
    }
}
