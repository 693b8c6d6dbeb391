//! squawkwatch: emergency squawk monitor CLI and query API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use squawk_core::classify::classify;
use squawk_core::config::{self, Config};
use squawk_core::types::{squawk_meaning, StateVector};

mod dispatcher;
mod feed;
mod logging;
mod lookup;
mod monitor;
mod notification;
mod render;
mod scheduler;
mod sound;
mod web;

use dispatcher::AlertDispatcher;
use feed::{FeedClient, StateFeed};
use lookup::FlightLookup;
use monitor::Monitor;
use notification::WebhookDispatcher;
use render::{MapRenderer, RenderSink};
use scheduler::{ScheduleConfig, SchedulerStatus};
use sound::{BellCue, CommandCue, CueSink};

#[derive(Parser)]
#[command(name = "squawkwatch", version, about = "Watch live air traffic for squawk 7700")]
struct Cli {
    /// Config file (default: ~/.squawkwatch/config.yaml)
    #[arg(long, global = true, env = "SQUAWKWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// State-vector endpoint
    #[arg(long, global = true, env = "SQUAWKWATCH_FEED_URL")]
    feed_url: Option<String>,

    /// Seconds between polls
    #[arg(
        long,
        global = true,
        env = "SQUAWKWATCH_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: Option<u64>,

    /// Directory for rendered maps
    #[arg(long, global = true, env = "SQUAWKWATCH_OUTPUT_DIR")]
    output_dir: Option<String>,

    /// Program used to play the alert sound
    #[arg(long, global = true, env = "SQUAWKWATCH_PLAYER")]
    player: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed and alert on 7700 until Ctrl-C
    Monitor {
        /// Also serve the query API
        #[arg(long)]
        serve: bool,

        #[arg(long, env = "SQUAWKWATCH_HOST")]
        host: Option<String>,

        #[arg(long, env = "SQUAWKWATCH_PORT")]
        port: Option<u16>,
    },

    /// Serve the query API; monitoring is started through the API
    Serve {
        #[arg(long, env = "SQUAWKWATCH_HOST")]
        host: Option<String>,

        #[arg(long, env = "SQUAWKWATCH_PORT")]
        port: Option<u16>,
    },

    /// Fetch once and list aircraft currently squawking 7700
    Emergencies,

    /// Show the current state of one aircraft
    Lookup {
        /// ICAO24 address (lowercase hex, e.g. 4b1805)
        icao24: String,

        /// Also render the flight map
        #[arg(long)]
        render: bool,
    },

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli);

    match cli.command {
        Commands::Monitor { serve, host, port } => {
            let bind = serve.then(|| {
                (
                    host.unwrap_or_else(|| config.dashboard.host.clone()),
                    port.unwrap_or(config.dashboard.port),
                )
            });
            cmd_monitor(&config, bind).await
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.dashboard.host.clone());
            let port = port.unwrap_or(config.dashboard.port);
            cmd_serve(&config, &host, port).await
        }
        Commands::Emergencies => cmd_emergencies(&config).await,
        Commands::Lookup { icao24, render } => cmd_lookup(&config, &icao24, render).await,
        Commands::InitConfig { force } => cmd_init_config(force),
    }
}

fn exit_with(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

/// File config with CLI and environment overrides applied.
fn load_config(cli: &Cli) -> Config {
    let mut config = config::load_config(cli.config.as_deref())
        .unwrap_or_else(|e| exit_with(format!("loading config: {e}")));

    if let Some(url) = &cli.feed_url {
        config.feed.url = url.clone();
    }
    if let Some(secs) = cli.interval {
        config.monitor.interval_secs = secs;
    }
    if let Some(dir) = &cli.output_dir {
        config.render.output_dir = dir.clone();
    }
    if let Some(player) = &cli.player {
        config.alert.player = Some(player.clone());
    }
    config
}

fn build_feed(config: &Config) -> FeedClient {
    let client = FeedClient::new(&config.feed.url, config.feed.timeout())
        .unwrap_or_else(|e| exit_with(format!("building feed client: {e}")));
    tracing::debug!(url = client.url(), "feed client ready");
    client
}

fn build_dispatcher(config: &Config) -> Arc<AlertDispatcher> {
    let cue: Arc<dyn CueSink> = match config.alert.player.as_deref().and_then(CommandCue::new) {
        Some(player) => Arc::new(player),
        None => Arc::new(BellCue),
    };
    let renderer = Arc::new(MapRenderer::new(&config.render.output_dir));
    tracing::debug!(dir = %renderer.output_dir().display(), "maps output directory");

    let mut dispatcher =
        AlertDispatcher::new(cue, renderer, &config.alert.sound, config.route.clone());
    if let Some(url) = &config.webhook {
        dispatcher = dispatcher.with_webhook(WebhookDispatcher::new(url));
    }
    Arc::new(dispatcher)
}

fn build_monitor(config: &Config) -> Arc<Monitor> {
    let schedule = ScheduleConfig {
        interval: config.monitor.interval(),
        max_backoff: config.monitor.max_backoff(),
    };
    Arc::new(Monitor::new(
        Arc::new(build_feed(config)),
        build_dispatcher(config),
        schedule,
        config.monitor.queue_capacity,
    ))
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn log_final_status(status: &SchedulerStatus) {
    tracing::info!(
        cycles = status.cycles,
        consecutive_failures = status.consecutive_failures,
        "monitoring stopped"
    );
}

async fn cmd_monitor(config: &Config, bind: Option<(String, u16)>) {
    let monitor = build_monitor(config);
    if let Err(e) = monitor.start_monitoring().await {
        exit_with(e);
    }
    tracing::info!(
        feed = %config.feed.url,
        interval_secs = config.monitor.interval_secs,
        "monitoring for squawk 7700 (Ctrl-C to stop)"
    );

    match bind {
        Some((host, port)) => {
            if let Err(e) = web::serve(Arc::clone(&monitor), &host, port, ctrl_c()).await {
                tracing::error!(error = %e, "query API failed");
            }
        }
        None => ctrl_c().await,
    }

    tracing::info!("shutting down");
    match monitor.stop_monitoring().await {
        Ok(status) => log_final_status(&status),
        Err(e) => tracing::warn!(error = %e, "monitor was not running at shutdown"),
    }
}

async fn cmd_serve(config: &Config, host: &str, port: u16) {
    let monitor = build_monitor(config);

    if let Err(e) = web::serve(Arc::clone(&monitor), host, port, ctrl_c()).await {
        exit_with(format!("query API on {host}:{port}: {e}"));
    }

    // Monitoring may have been started through the API
    if let Ok(status) = monitor.stop_monitoring().await {
        log_final_status(&status);
    }
}

async fn cmd_emergencies(config: &Config) {
    let snapshot = build_feed(config)
        .fetch()
        .await
        .unwrap_or_else(|e| exit_with(format!("fetching states: {e}")));
    let emergencies = classify(&snapshot);

    println!();
    println!("{} aircraft in view", snapshot.len());
    println!();

    if emergencies.is_empty() {
        println!("No emergency flights");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ICAO24", "Callsign", "Country", "Lat", "Lon"]);
    for sv in &emergencies {
        table.add_row(vec![
            Cell::new(&sv.icao24),
            Cell::new(sv.callsign.as_deref().unwrap_or("-")),
            Cell::new(&sv.origin_country),
            Cell::new(opt_fmt(sv.latitude, 4)),
            Cell::new(opt_fmt(sv.longitude, 4)),
        ]);
    }
    println!("{table}");
}

async fn cmd_lookup(config: &Config, icao24: &str, render: bool) {
    let lookup = FlightLookup::new(Arc::new(build_feed(config)));
    let flight = lookup
        .lookup(icao24)
        .await
        .unwrap_or_else(|e| exit_with(e));

    println!();
    println!("{}", flight_table(&flight));

    if render {
        let renderer = MapRenderer::new(&config.render.output_dir);
        match renderer.render(&flight, config.route.as_ref()).await {
            Ok(path) => println!("Map written to {}", path.display()),
            Err(e) => exit_with(e),
        }
    }
}

fn cmd_init_config(force: bool) {
    let path = config::config_file();
    if path.exists() && !force {
        exit_with(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    match config::save_config(&Config::default()) {
        Ok(path) => println!("Wrote {}", path.display()),
        Err(e) => exit_with(e),
    }
}

fn opt_fmt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or("-".into())
}

fn flight_table(sv: &StateVector) -> Table {
    let squawk = match sv.squawk.as_deref() {
        Some(code) => match squawk_meaning(code) {
            Some(meaning) => format!("{code} ({meaning})"),
            None => code.to_string(),
        },
        None => "-".into(),
    };

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let rows = [
        ("ICAO24", sv.icao24.clone()),
        ("Callsign", sv.callsign.clone().unwrap_or("-".into())),
        ("Country", sv.origin_country.clone()),
        ("Squawk", squawk),
        ("Latitude", opt_fmt(sv.latitude, 4)),
        ("Longitude", opt_fmt(sv.longitude, 4)),
        ("Altitude (m)", opt_fmt(sv.altitude_m, 0)),
        ("Velocity (m/s)", opt_fmt(sv.velocity_mps, 1)),
        ("Heading (deg)", opt_fmt(sv.heading_deg, 1)),
        ("Vertical rate (m/s)", opt_fmt(sv.vertical_rate_mps, 1)),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table
}
