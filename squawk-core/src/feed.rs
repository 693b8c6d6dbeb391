//! Decoding of the aircraft-state feed response body.
//!
//! The upstream returns `{"time": <unix>, "states": [[...], ...]}` where each
//! state is a fixed-position array. Only the columns we use are mapped;
//! rows that are too short or lack an ICAO24 string are skipped rather than
//! failing the whole batch.

use serde_json::Value;

use crate::types::{FetchError, StateSnapshot, StateVector};

// ---------------------------------------------------------------------------
// Row layout
// ---------------------------------------------------------------------------

const COL_ICAO24: usize = 0;
const COL_CALLSIGN: usize = 1;
const COL_ORIGIN_COUNTRY: usize = 2;
const COL_LONGITUDE: usize = 5;
const COL_LATITUDE: usize = 6;
const COL_ALTITUDE: usize = 7;
const COL_VELOCITY: usize = 9;
const COL_HEADING: usize = 10;
const COL_VERTICAL_RATE: usize = 11;
const COL_SQUAWK: usize = 14;

/// Rows shorter than this are malformed.
pub const MIN_ROW_LEN: usize = 15;

// ---------------------------------------------------------------------------
// Bounding box
// ---------------------------------------------------------------------------

/// Geographic query window sent as `lamin/lomin/lamax/lomax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// The whole globe.
    pub const WORLD: BoundingBox = BoundingBox {
        lat_min: -90.0,
        lon_min: -180.0,
        lat_max: 90.0,
        lon_max: 180.0,
    };

    /// Query parameters in upstream naming.
    pub fn query(&self) -> [(&'static str, f64); 4] {
        [
            ("lamin", self.lat_min),
            ("lomin", self.lon_min),
            ("lamax", self.lat_max),
            ("lomax", self.lon_max),
        ]
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a full response body into a snapshot.
///
/// A `null` states field means no aircraft in view and yields an empty
/// snapshot. A missing field is a decode error.
pub fn parse_states(body: &str) -> Result<StateSnapshot, FetchError> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let obj = root
        .as_object()
        .ok_or_else(|| FetchError::Decode("response is not a JSON object".into()))?;

    let rows = match obj.get("states") {
        None => return Err(FetchError::Decode("missing 'states' field".into())),
        Some(Value::Null) => &[][..],
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(_) => return Err(FetchError::Decode("'states' is not an array".into())),
    };

    let mut snapshot = StateSnapshot {
        time: obj.get("time").and_then(Value::as_i64),
        states: Vec::with_capacity(rows.len()),
        skipped: 0,
    };

    for row in rows {
        match parse_row(row) {
            Some(sv) => snapshot.states.push(sv),
            None => snapshot.skipped += 1,
        }
    }

    Ok(snapshot)
}

/// Map one positional row to a state vector. `None` if malformed.
pub fn parse_row(row: &Value) -> Option<StateVector> {
    let cols = row.as_array()?;
    if cols.len() < MIN_ROW_LEN {
        return None;
    }

    let icao24 = cols[COL_ICAO24].as_str()?.trim();
    if icao24.is_empty() {
        return None;
    }

    Some(StateVector {
        icao24: icao24.to_string(),
        // Callsigns are space-padded to 8 characters upstream.
        callsign: string_col(&cols[COL_CALLSIGN])
            .map(|s| s.trim_end().to_string())
            .filter(|s| !s.is_empty()),
        origin_country: string_col(&cols[COL_ORIGIN_COUNTRY])
            .unwrap_or_default()
            .to_string(),
        longitude: cols[COL_LONGITUDE].as_f64(),
        latitude: cols[COL_LATITUDE].as_f64(),
        altitude_m: cols[COL_ALTITUDE].as_f64(),
        velocity_mps: cols[COL_VELOCITY].as_f64(),
        heading_deg: cols[COL_HEADING].as_f64(),
        vertical_rate_mps: cols[COL_VERTICAL_RATE].as_f64(),
        squawk: string_col(&cols[COL_SQUAWK]).map(str::to_string),
    })
}

fn string_col(v: &Value) -> Option<&str> {
    v.as_str()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "time": 1700000000,
        "states": [
            ["abc123", "UAL123  ", "United States", 1700000000, 1700000000,
             -82.5, 35.5, 10668.0, false, 230.5, 90.0, -5.2, null, 10700.0, "7700", false, 0],
            ["4840d6", null, "Netherlands", 1700000000, 1700000000,
             null, null, null, true, 0, null, null, null, null, null, false, 0]
        ]
    }"#;

    #[test]
    fn test_parse_full_row() {
        let snap = parse_states(SAMPLE).unwrap();
        assert_eq!(snap.time, Some(1700000000));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.skipped, 0);

        let sv = &snap.states[0];
        assert_eq!(sv.icao24, "abc123");
        assert_eq!(sv.callsign.as_deref(), Some("UAL123"));
        assert_eq!(sv.origin_country, "United States");
        assert_eq!(sv.longitude, Some(-82.5));
        assert_eq!(sv.latitude, Some(35.5));
        assert_eq!(sv.altitude_m, Some(10668.0));
        assert_eq!(sv.velocity_mps, Some(230.5));
        assert_eq!(sv.heading_deg, Some(90.0));
        assert_eq!(sv.vertical_rate_mps, Some(-5.2));
        assert_eq!(sv.squawk.as_deref(), Some("7700"));
    }

    #[test]
    fn test_parse_nulls() {
        let snap = parse_states(SAMPLE).unwrap();
        let sv = &snap.states[1];
        assert_eq!(sv.icao24, "4840d6");
        assert!(sv.callsign.is_none());
        assert!(sv.position().is_none());
        assert_eq!(sv.velocity_mps, Some(0.0));
        assert!(sv.squawk.is_none());
    }

    #[test]
    fn test_short_row_skipped() {
        let body = r#"{"time": 1, "states": [
            ["abc123", "X", "Y"],
            ["def456", "TEST", "France", 0, 0, 2.3, 48.8, 1000.0, false, 100.0, 180.0, 0.0, null, 1000.0, "1200"]
        ]}"#;
        let snap = parse_states(body).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.skipped, 1);
        assert_eq!(snap.states[0].icao24, "def456");
    }

    #[test]
    fn test_non_string_icao_skipped() {
        let body = r#"{"states": [
            [42, "X", "Y", 0, 0, null, null, null, false, null, null, null, null, null, "7700"],
            "not a row"
        ]}"#;
        let snap = parse_states(body).unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.skipped, 2);
    }

    #[test]
    fn test_null_states_is_empty() {
        let snap = parse_states(r#"{"time": 5, "states": null}"#).unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.time, Some(5));
    }

    #[test]
    fn test_missing_states_is_decode_error() {
        let err = parse_states(r#"{"time": 5}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        assert!(matches!(
            parse_states("{not json").unwrap_err(),
            FetchError::Decode(_)
        ));
        assert!(matches!(
            parse_states("[1, 2]").unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[test]
    fn test_world_query() {
        let q = BoundingBox::WORLD.query();
        assert_eq!(q[0], ("lamin", -90.0));
        assert_eq!(q[1], ("lomin", -180.0));
        assert_eq!(q[2], ("lamax", 90.0));
        assert_eq!(q[3], ("lomax", 180.0));
    }
}
