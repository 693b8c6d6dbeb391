//! Shared types, error enums, and the aircraft state data model.

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to obtain a snapshot from the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result of a single-aircraft lookup that did not produce a state vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("flight not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errors from the map rendering sink.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no position reported for {0}")]
    NoPosition(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the audible cue sink.
#[derive(Debug, Error)]
pub enum SoundError {
    #[error("failed to start player '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the monitoring control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("monitoring is already running")]
    AlreadyRunning,
    #[error("monitoring is not running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Squawk codes
// ---------------------------------------------------------------------------

/// General emergency transponder code.
pub const EMERGENCY_SQUAWK: &str = "7700";

/// Meaning of the well-known special-purpose squawk codes.
pub fn squawk_meaning(squawk: &str) -> Option<&'static str> {
    match squawk {
        "7500" => Some("Hijack"),
        "7600" => Some("Radio failure"),
        "7700" => Some("Emergency"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// State vectors
// ---------------------------------------------------------------------------

/// One aircraft's reported state at fetch time.
///
/// `icao24` is the stable identity across polling cycles; every other field
/// may be missing when the upstream has no data for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub velocity_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_mps: Option<f64>,
    pub squawk: Option<String>,
}

impl StateVector {
    /// Minimal record with only the identity fields set.
    pub fn new(icao24: &str, origin_country: &str) -> Self {
        StateVector {
            icao24: icao24.to_string(),
            callsign: None,
            origin_country: origin_country.to_string(),
            longitude: None,
            latitude: None,
            altitude_m: None,
            velocity_mps: None,
            heading_deg: None,
            vertical_rate_mps: None,
            squawk: None,
        }
    }

    /// `(lat, lon)` when both are reported.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Callsign if reported, otherwise the ICAO24 address.
    pub fn label(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.icao24)
    }
}

/// Every state vector returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// Upstream timestamp (unix seconds) the states refer to.
    pub time: Option<i64>,
    pub states: Vec<StateVector>,
    /// Rows dropped because they were malformed.
    pub skipped: usize,
}

impl StateSnapshot {
    pub fn new(states: Vec<StateVector>) -> Self {
        StateSnapshot {
            time: None,
            states,
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Find an aircraft by exact ICAO24 match. Later duplicates win.
    pub fn find(&self, icao24: &str) -> Option<&StateVector> {
        self.states.iter().rev().find(|sv| sv.icao24 == icao24)
    }
}

// ---------------------------------------------------------------------------
// Alert events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Raised,
    Cleared,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Raised => write!(f, "raised"),
            AlertKind::Cleared => write!(f, "cleared"),
        }
    }
}

/// A change in an aircraft's emergency status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub flight: StateVector,
    pub kind: AlertKind,
}

impl AlertEvent {
    pub fn raised(flight: StateVector) -> Self {
        AlertEvent {
            flight,
            kind: AlertKind::Raised,
        }
    }

    pub fn cleared(flight: StateVector) -> Self {
        AlertEvent {
            flight,
            kind: AlertKind::Cleared,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
