//! On-demand single-flight lookup. Bypasses the tracker and dispatcher.

use std::sync::Arc;

use squawk_core::types::{LookupError, StateVector};

use crate::feed::StateFeed;

pub struct FlightLookup {
    feed: Arc<dyn StateFeed>,
}

impl FlightLookup {
    pub fn new(feed: Arc<dyn StateFeed>) -> Self {
        FlightLookup { feed }
    }

    /// Fetch once and return the aircraft with this exact ICAO24.
    pub async fn lookup(&self, icao24: &str) -> Result<StateVector, LookupError> {
        let snapshot = self.feed.fetch().await?;
        snapshot
            .find(icao24)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(icao24.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::{snapshot_of, squawking, ScriptedFeed};
    use squawk_core::types::FetchError;

    #[tokio::test]
    async fn test_lookup_found() {
        let feed = ScriptedFeed::fixed(snapshot_of(vec![
            squawking("abc123", "7700"),
            squawking("def456", "1200"),
        ]));
        let lookup = FlightLookup::new(Arc::new(feed));

        let sv = lookup.lookup("def456").await.unwrap();
        assert_eq!(sv.icao24, "def456");
        assert_eq!(sv.squawk.as_deref(), Some("1200"));
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let feed = ScriptedFeed::fixed(snapshot_of(vec![squawking("abc123", "7700")]));
        let lookup = FlightLookup::new(Arc::new(feed));

        assert_eq!(
            lookup.lookup("zzz999").await.unwrap_err(),
            LookupError::NotFound("zzz999".into())
        );
    }

    #[tokio::test]
    async fn test_lookup_is_exact_match() {
        let feed = ScriptedFeed::fixed(snapshot_of(vec![squawking("abc123", "7700")]));
        let lookup = FlightLookup::new(Arc::new(feed));

        assert!(lookup.lookup("ABC123").await.is_err());
        assert!(lookup.lookup("abc12").await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_fetch_failure() {
        let feed = ScriptedFeed::new(vec![]).with_fallback(Err(FetchError::HttpStatus(429)));
        let lookup = FlightLookup::new(Arc::new(feed));

        assert_eq!(
            lookup.lookup("abc123").await.unwrap_err(),
            LookupError::Fetch(FetchError::HttpStatus(429))
        );
    }
}
