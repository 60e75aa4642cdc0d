//! RoverStation - ground station daemon
//!
//! ```bash
//! # Default config (rover-station.toml, built-in defaults if missing)
//! rover-station
//!
//! # Custom config file
//! rover-station --config lab.toml
//! ```

use rover_link::Link;
use rover_station::{
    operator, DeadReckoning, Error, LogRenderer, Result, Station, StationConfig,
};
use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "rover-station.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `rover-station <path>` (positional)
/// - `rover-station --config <path>` (flag-based)
/// - `rover-station -c <path>` (short flag)
///
/// Returns `None` if no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() {
    let loaded = match parse_config_path() {
        Some(path) => StationConfig::from_file(&path).map(|config| (config, path)),
        None => StationConfig::load_or_default(DEFAULT_CONFIG)
            .map(|config| (config, DEFAULT_CONFIG.to_string())),
    };

    let level = loaded
        .as_ref()
        .map(|(config, _)| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = loaded.and_then(|(config, path)| {
        log::info!("RoverStation v{} starting...", env!("CARGO_PKG_VERSION"));
        log::info!("Using config: {}", path);
        run(config)
    });

    if let Err(e) = result {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(config: StationConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!(
        "Link: {} at {} baud",
        config.link.port,
        config.link.baud_rate
    );
    let mut link = Link::open(config.link.clone())?;
    link.start_streaming()?;

    let console = operator::spawn_console()?;
    let mut station = Station::new(
        config,
        link,
        Box::new(DeadReckoning::new()),
        Box::new(LogRenderer::default()),
        console,
        running,
    )?;

    station.run()
}
