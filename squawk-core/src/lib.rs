//! squawk-core: Pure decode, classification, and alert tracking for the
//! emergency squawk monitor.
//!
//! No async and no network I/O, only the data model and algorithms. This crate
//! is the shared core used by `squawk-server` (polling engine, CLI, query API).

pub mod backoff;
pub mod classify;
pub mod config;
pub mod feed;
pub mod tracker;
pub mod types;

// Re-export commonly used types at crate root
pub use backoff::Backoff;
pub use classify::{classify, is_emergency};
pub use feed::{parse_states, BoundingBox};
pub use tracker::{AlertTracker, EmergencyView, TrackerWriter};
pub use types::*;
