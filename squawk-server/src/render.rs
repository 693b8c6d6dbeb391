//! Map rendering sink. Writes a self-contained Leaflet HTML page per flight.
//!
//! The page centres on the aircraft's reported position with a marker
//! (callsign + origin country) and a detail circle (altitude, velocity,
//! heading, vertical rate). When a route is configured, departure and
//! destination markers are joined by a line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;

use squawk_core::config::Route;
use squawk_core::types::{RenderError, StateVector};

/// Renders one flight (plus optional reference route) to an artifact.
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn render(
        &self,
        flight: &StateVector,
        route: Option<&Route>,
    ) -> Result<PathBuf, RenderError>;
}

const PAGE_CSS: &str = r#"html, body { margin: 0; padding: 0; height: 100%; }
body { font-family: 'Courier New', monospace; background: #0a0a0a; color: #e0e0e0; }
header { background: #111; border-bottom: 1px solid #333; padding: 8px 16px; font-size: 13px; }
header .brand { color: #ff8800; font-weight: bold; margin-right: 16px; }
#map { position: absolute; top: 36px; bottom: 0; left: 0; right: 0; }"#;

const PAGE_JS: &str = r#"const map = L.map('map').setView([flight.lat, flight.lon], 8);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
function pin(color) {
    return L.circleMarker([0, 0], { radius: 8, color: color, fillColor: color, fillOpacity: 0.9 });
}
if (route) {
    pin('green').setLatLng([route.origin.lat, route.origin.lon])
        .bindTooltip('Departure: ' + route.origin.name).addTo(map);
    pin('red').setLatLng([route.destination.lat, route.destination.lon])
        .bindTooltip('Destination: ' + route.destination.name).addTo(map);
    L.polyline([[route.origin.lat, route.origin.lon], [route.destination.lat, route.destination.lon]],
        { color: 'blue' }).addTo(map);
}
L.marker([flight.lat, flight.lon])
    .bindTooltip('Flight ' + flight.callsign + ' - ' + flight.country).addTo(map);
L.circleMarker([flight.lat, flight.lon], { radius: 6, color: 'blue', fill: true, fillOpacity: 0.7 })
    .bindTooltip(flight.details.join('<br>')).addTo(map);"#;

/// Writes `flight_<icao24>.html` into the output directory.
pub struct MapRenderer {
    output_dir: PathBuf,
}

impl MapRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        MapRenderer {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifact path for a flight. ICAO24 is reduced to alphanumerics.
    pub fn path_for(&self, icao24: &str) -> PathBuf {
        let safe: String = icao24
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        self.output_dir.join(format!("flight_{safe}.html"))
    }
}

#[async_trait]
impl RenderSink for MapRenderer {
    async fn render(
        &self,
        flight: &StateVector,
        route: Option<&Route>,
    ) -> Result<PathBuf, RenderError> {
        let html = render_map_html(flight, route)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(&flight.icao24);
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }
}

fn fmt_opt(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(x) => format!("{x:.1}{unit}"),
        None => "-".into(),
    }
}

/// Build the HTML document. Fails if the flight has no position.
pub fn render_map_html(flight: &StateVector, route: Option<&Route>) -> Result<String, RenderError> {
    let (lat, lon) = flight
        .position()
        .ok_or_else(|| RenderError::NoPosition(flight.icao24.clone()))?;

    let data = json!({
        "lat": lat,
        "lon": lon,
        "callsign": flight.label(),
        "country": flight.origin_country,
        "details": [
            format!("Altitude: {}", fmt_opt(flight.altitude_m, " m")),
            format!("Velocity: {}", fmt_opt(flight.velocity_mps, " m/s")),
            format!("Heading: {}", fmt_opt(flight.heading_deg, "\u{b0}")),
            format!("Vertical Rate: {}", fmt_opt(flight.vertical_rate_mps, " m/s")),
        ],
    });
    let route = serde_json::to_value(route).unwrap_or(serde_json::Value::Null);

    let title = format!("Flight {} ({})", flight.label(), flight.icao24);

    let mut s = String::with_capacity(PAGE_CSS.len() + PAGE_JS.len() + 1024);
    s.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    s.push_str("<meta charset=\"UTF-8\">\n");
    s.push_str("<title>squawkwatch - ");
    s.push_str(&html_escape(&title));
    s.push_str("</title>\n");
    s.push_str("<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\" />\n");
    s.push_str("<script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>\n");
    s.push_str("<style>\n");
    s.push_str(PAGE_CSS);
    s.push_str("\n</style>\n</head>\n<body>\n");
    s.push_str("<header><span class=\"brand\">squawkwatch</span>");
    s.push_str(&html_escape(&title));
    s.push_str("</header>\n<div id=\"map\"></div>\n<script>\n");
    s.push_str("const flight = ");
    s.push_str(&script_json(&data));
    s.push_str(";\nconst route = ");
    s.push_str(&script_json(&route));
    s.push_str(";\n");
    s.push_str(PAGE_JS);
    s.push_str("\n</script>\n</body>\n</html>\n");
    Ok(s)
}

/// JSON safe to embed inside a `<script>` element.
fn script_json(v: &serde_json::Value) -> String {
    v.to_string().replace('<', "\\u003c")
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use squawk_core::config::RefPoint;

    fn positioned() -> StateVector {
        let mut sv = StateVector::new("abc123", "United States");
        sv.callsign = Some("UAL123".into());
        sv.latitude = Some(35.5);
        sv.longitude = Some(-82.5);
        sv.altitude_m = Some(10668.0);
        sv.velocity_mps = Some(230.5);
        sv
    }

    fn route() -> Route {
        Route {
            origin: RefPoint {
                name: "New York".into(),
                lat: 40.7128,
                lon: -74.006,
            },
            destination: RefPoint {
                name: "Los Angeles".into(),
                lat: 34.0522,
                lon: -118.2437,
            },
        }
    }

    #[test]
    fn test_html_contains_flight_and_route() {
        let html = render_map_html(&positioned(), Some(&route())).unwrap();
        assert!(html.contains("Flight UAL123 (abc123)"));
        assert!(html.contains("\"lat\":35.5"));
        assert!(html.contains("Altitude: 10668.0 m"));
        assert!(html.contains("Heading: -"));
        assert!(html.contains("Los Angeles"));
    }

    #[test]
    fn test_html_without_route() {
        let html = render_map_html(&positioned(), None).unwrap();
        assert!(html.contains("const route = null;"));
    }

    #[test]
    fn test_no_position_is_error() {
        let sv = StateVector::new("abc123", "United States");
        assert!(matches!(
            render_map_html(&sv, None),
            Err(RenderError::NoPosition(id)) if id == "abc123"
        ));
    }

    #[test]
    fn test_script_injection_escaped() {
        let mut sv = positioned();
        sv.callsign = Some("</script><b>".into());
        let html = render_map_html(&sv, None).unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("&lt;/script&gt;&lt;b&gt;"));
    }

    #[test]
    fn test_path_sanitized() {
        let r = MapRenderer::new("/tmp/maps");
        assert_eq!(r.path_for("../ab/c1"), PathBuf::from("/tmp/maps/flight_abc1.html"));
    }

    #[tokio::test]
    async fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MapRenderer::new(dir.path().join("maps"));

        let path = renderer.render(&positioned(), Some(&route())).await.unwrap();
        assert_eq!(path, dir.path().join("maps").join("flight_abc123.html"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<!DOCTYPE html>"));
    }
}
