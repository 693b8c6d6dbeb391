//! Web server: axum REST API over the monitoring facade.
//!
//! Shared state is just the `Monitor`; every handler goes through its query
//! interface (start, stop, list emergencies, look up a flight).

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::monitor::Monitor;

pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub monitor: Arc<Monitor>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/monitor", axum::routing::get(routes::api_monitor_status))
        .route(
            "/api/monitor/start",
            axum::routing::post(routes::api_monitor_start),
        )
        .route(
            "/api/monitor/stop",
            axum::routing::post(routes::api_monitor_stop),
        )
        .route(
            "/api/emergencies",
            axum::routing::get(routes::api_emergencies),
        )
        .route(
            "/api/flights/:icao24",
            axum::routing::get(routes::api_flight),
        )
        .route(
            "/api/flights/:icao24/render",
            axum::routing::post(routes::api_flight_render),
        )
        .with_state(state)
        .layer(cors)
}

/// Start the web server. Runs until `shutdown` resolves.
pub async fn serve(
    monitor: Arc<Monitor>,
    host: &str,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(Arc::new(AppState { monitor }));
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("query API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
