//! HTTP client for the aircraft-state feed.
//!
//! One GET per call, no retries. Retry policy belongs to the scheduler.
//! Every request carries a timeout so a hung upstream cannot stall shutdown.

use std::time::Duration;

use async_trait::async_trait;

use squawk_core::feed::{parse_states, BoundingBox};
use squawk_core::types::{FetchError, StateSnapshot};

/// Source of state snapshots. Implemented by `FeedClient`; tests swap in
/// scripted feeds.
#[async_trait]
pub trait StateFeed: Send + Sync {
    async fn fetch(&self) -> Result<StateSnapshot, FetchError>;
}

#[derive(Clone)]
pub struct FeedClient {
    url: String,
    bbox: BoundingBox,
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("squawkwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(FeedClient {
            url: url.to_string(),
            bbox: BoundingBox::WORLD,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StateFeed for FeedClient {
    async fn fetch(&self) -> Result<StateSnapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&self.bbox.query())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let snapshot = parse_states(&body)?;
        if snapshot.skipped > 0 {
            tracing::debug!(skipped = snapshot.skipped, "dropped malformed state rows");
        }
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Scripted feed (shared with scheduler/monitor/web tests)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    const BODY: &str = r#"{"time": 1700000000, "states": [
        ["abc123", "UAL123  ", "United States", 0, 0, -82.5, 35.5, 10668.0, false, 230.5, 90.0, -5.2, null, 10700.0, "7700", false, 0]
    ]}"#;

    /// Serve `router` on an ephemeral port; returns the base URL.
    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_ok_sends_world_bbox() {
        let seen: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let seen_handler = Arc::clone(&seen);
        let router = Router::new().route(
            "/states/all",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = Arc::clone(&seen_handler);
                async move {
                    *seen.lock().unwrap() = q;
                    BODY
                }
            }),
        );
        let base = spawn_server(router).await;

        let client = FeedClient::new(&format!("{base}/states/all"), Duration::from_secs(5)).unwrap();
        let snap = client.fetch().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.states[0].icao24, "abc123");

        let q = seen.lock().unwrap().clone();
        assert_eq!(q["lamin"].parse::<f64>().unwrap(), -90.0);
        assert_eq!(q["lomin"].parse::<f64>().unwrap(), -180.0);
        assert_eq!(q["lamax"].parse::<f64>().unwrap(), 90.0);
        assert_eq!(q["lomax"].parse::<f64>().unwrap(), 180.0);
    }

    #[tokio::test]
    async fn test_fetch_http_status() {
        let router = Router::new().route(
            "/states/all",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let base = spawn_server(router).await;

        let client = FeedClient::new(&format!("{base}/states/all"), Duration::from_secs(5)).unwrap();
        assert_eq!(client.fetch().await.unwrap_err(), FetchError::HttpStatus(503));
    }

    #[tokio::test]
    async fn test_fetch_decode_error() {
        let router = Router::new().route("/states/all", get(|| async { r#"{"time": 1}"# }));
        let base = spawn_server(router).await;

        let client = FeedClient::new(&format!("{base}/states/all"), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.fetch().await.unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FeedClient::new(&format!("http://{addr}/states/all"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.fetch().await.unwrap_err(),
            FetchError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_error() {
        let router = Router::new().route(
            "/states/all",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                BODY
            }),
        );
        let base = spawn_server(router).await;

        let client =
            FeedClient::new(&format!("{base}/states/all"), Duration::from_millis(200)).unwrap();
        assert!(matches!(
            client.fetch().await.unwrap_err(),
            FetchError::Network(_)
        ));
    }
}
