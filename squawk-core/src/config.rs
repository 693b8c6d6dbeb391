//! Configuration file management for squawkwatch.
//!
//! Reads/writes `~/.squawkwatch/config.yaml` with feed endpoint, polling
//! cadence, alert sound, map output, route reference points, dashboard
//! address, and webhook URL.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::ConfigError;

pub const DEFAULT_FEED_URL: &str = "https://opensky-network.org/api/states/all";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub feed: FeedConfig,
    pub monitor: MonitorConfig,
    pub alert: AlertConfig,
    pub render: RenderConfig,
    pub route: Option<Route>,
    pub dashboard: DashboardConfig,
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub max_backoff_secs: u64,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub sound: String,
    /// External player program. Terminal bell when unset.
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub output_dir: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

/// A named map reference point.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RefPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Origin and destination drawn on rendered maps.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Route {
    pub origin: RefPoint,
    pub destination: RefPoint,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            feed: FeedConfig {
                url: DEFAULT_FEED_URL.into(),
                timeout_secs: 10,
            },
            monitor: MonitorConfig {
                interval_secs: 20,
                max_backoff_secs: 160,
                queue_capacity: 64,
            },
            alert: AlertConfig {
                sound: "Alert.mp3".into(),
                player: None,
            },
            render: RenderConfig {
                output_dir: "maps".into(),
            },
            route: None,
            dashboard: DashboardConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            webhook: None,
        }
    }
}

/// Get the config directory path (`~/.squawkwatch/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".squawkwatch")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from an explicit path, or `~/.squawkwatch/config.yaml`.
///
/// A missing file yields the defaults. An unreadable or invalid file is an
/// error.
pub fn load_config(path: Option<&std::path::Path>) -> Result<Config, ConfigError> {
    let path = path.map(PathBuf::from).unwrap_or_else(config_file);
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path)?;
    parse_config(&text)
}

/// Save config to `~/.squawkwatch/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(config_dir())?;
    let path = config_file();
    std::fs::write(&path, serialize_config(config))?;
    Ok(path)
}

/// Route fields collected while parsing; only complete routes are kept.
#[derive(Default)]
struct RouteParts {
    origin_name: Option<String>,
    origin_lat: Option<f64>,
    origin_lon: Option<f64>,
    destination_name: Option<String>,
    destination_lat: Option<f64>,
    destination_lon: Option<f64>,
}

impl RouteParts {
    fn build(self) -> Result<Option<Route>, ConfigError> {
        let any = self.origin_name.is_some()
            || self.origin_lat.is_some()
            || self.origin_lon.is_some()
            || self.destination_name.is_some()
            || self.destination_lat.is_some()
            || self.destination_lon.is_some();
        match self {
            RouteParts {
                origin_name: Some(on),
                origin_lat: Some(olat),
                origin_lon: Some(olon),
                destination_name: Some(dn),
                destination_lat: Some(dlat),
                destination_lon: Some(dlon),
            } => Ok(Some(Route {
                origin: RefPoint {
                    name: on,
                    lat: olat,
                    lon: olon,
                },
                destination: RefPoint {
                    name: dn,
                    lat: dlat,
                    lon: dlon,
                },
            })),
            _ if any => Err(ConfigError::Invalid {
                key: "route".into(),
                value: "origin and destination need name, lat and lon".into(),
            }),
            _ => Ok(None),
        }
    }
}

/// Parse simple YAML-like config text.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    let mut route = RouteParts::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            if val.is_empty() {
                current_section = Some(key.to_string());
            } else {
                current_section = None;
                if key == "webhook" {
                    config.webhook = parse_string_value(val);
                }
            }
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };

        match (section, key) {
            ("feed", "url") => {
                if let Some(v) = parse_string_value(val) {
                    config.feed.url = v;
                }
            }
            ("feed", "timeout_secs") => config.feed.timeout_secs = parse_num(section, key, val)?,
            ("monitor", "interval_secs") => {
                config.monitor.interval_secs = parse_num(section, key, val)?
            }
            ("monitor", "max_backoff_secs") => {
                config.monitor.max_backoff_secs = parse_num(section, key, val)?
            }
            ("monitor", "queue_capacity") => {
                config.monitor.queue_capacity = parse_num(section, key, val)?
            }
            ("alert", "sound") => {
                if let Some(v) = parse_string_value(val) {
                    config.alert.sound = v;
                }
            }
            ("alert", "player") => config.alert.player = parse_string_value(val),
            ("render", "output_dir") => {
                if let Some(v) = parse_string_value(val) {
                    config.render.output_dir = v;
                }
            }
            ("route", "origin_name") => route.origin_name = parse_string_value(val),
            ("route", "origin_lat") => route.origin_lat = parse_float_value(val),
            ("route", "origin_lon") => route.origin_lon = parse_float_value(val),
            ("route", "destination_name") => route.destination_name = parse_string_value(val),
            ("route", "destination_lat") => route.destination_lat = parse_float_value(val),
            ("route", "destination_lon") => route.destination_lon = parse_float_value(val),
            ("dashboard", "host") => {
                if let Some(v) = parse_string_value(val) {
                    config.dashboard.host = v;
                }
            }
            ("dashboard", "port") => config.dashboard.port = parse_num(section, key, val)?,
            _ => {}
        }
    }

    config.route = route.build()?;
    if config.monitor.interval_secs == 0 {
        return Err(ConfigError::Invalid {
            key: "monitor.interval_secs".into(),
            value: "0".into(),
        });
    }
    if config.monitor.queue_capacity == 0 {
        return Err(ConfigError::Invalid {
            key: "monitor.queue_capacity".into(),
            value: "0".into(),
        });
    }

    Ok(config)
}

fn parse_num<T: std::str::FromStr>(section: &str, key: &str, val: &str) -> Result<T, ConfigError> {
    val.parse().map_err(|_| ConfigError::Invalid {
        key: format!("{section}.{key}"),
        value: val.to_string(),
    })
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

fn opt_string(key: &str, val: &Option<String>) -> String {
    match val {
        Some(v) => format!("{key}: \"{v}\""),
        None => format!("{key}: null"),
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# squawkwatch configuration".to_string(), String::new()];

    lines.push("feed:".into());
    lines.push(format!("  url: \"{}\"", config.feed.url));
    lines.push(format!("  timeout_secs: {}", config.feed.timeout_secs));
    lines.push(String::new());

    lines.push("monitor:".into());
    lines.push(format!("  interval_secs: {}", config.monitor.interval_secs));
    lines.push(format!("  max_backoff_secs: {}", config.monitor.max_backoff_secs));
    lines.push(format!("  queue_capacity: {}", config.monitor.queue_capacity));
    lines.push(String::new());

    lines.push("alert:".into());
    lines.push(format!("  sound: \"{}\"", config.alert.sound));
    lines.push(format!("  {}", opt_string("player", &config.alert.player)));
    lines.push(String::new());

    lines.push("render:".into());
    lines.push(format!("  output_dir: \"{}\"", config.render.output_dir));
    lines.push(String::new());

    match &config.route {
        Some(route) => {
            lines.push("route:".into());
            lines.push(format!("  origin_name: \"{}\"", route.origin.name));
            lines.push(format!("  origin_lat: {}", route.origin.lat));
            lines.push(format!("  origin_lon: {}", route.origin.lon));
            lines.push(format!("  destination_name: \"{}\"", route.destination.name));
            lines.push(format!("  destination_lat: {}", route.destination.lat));
            lines.push(format!("  destination_lon: {}", route.destination.lon));
        }
        None => {
            lines.push("# route:".into());
            lines.push("#   origin_name: \"New York\"".into());
            lines.push("#   origin_lat: 40.7128".into());
            lines.push("#   origin_lon: -74.006".into());
            lines.push("#   destination_name: \"Los Angeles\"".into());
            lines.push("#   destination_lat: 34.0522".into());
            lines.push("#   destination_lon: -118.2437".into());
        }
    }
    lines.push(String::new());

    lines.push("dashboard:".into());
    lines.push(format!("  host: \"{}\"", config.dashboard.host));
    lines.push(format!("  port: {}", config.dashboard.port));
    lines.push(String::new());

    lines.push(opt_string("webhook", &config.webhook));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
