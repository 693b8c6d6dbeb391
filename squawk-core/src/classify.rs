//! Emergency classifier.
//!
//! An aircraft is in emergency iff it squawks exactly `7700`. Aircraft with
//! no reported squawk never match.

use crate::types::{StateSnapshot, StateVector, EMERGENCY_SQUAWK};

/// True if this state vector reports the general emergency code.
pub fn is_emergency(sv: &StateVector) -> bool {
    sv.squawk.as_deref() == Some(EMERGENCY_SQUAWK)
}

/// Return the subset of the snapshot that is in emergency, in snapshot order.
pub fn classify(snapshot: &StateSnapshot) -> Vec<StateVector> {
    snapshot
        .states
        .iter()
        .filter(|sv| is_emergency(sv))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
