//! Demo engine binary for the colony agent-control core.
//!
//! This is the entry point that wires the colony to an in-memory world.
//! It loads configuration, initializes logging, builds the demo scenario,
//! and runs the tick loop for the configured number of ticks.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$COLONY_CONFIG` or `colony-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the scenario world and register its units
//! 4. Run the tick loop
//! 5. Snapshot the logistics state and log the result

mod error;
mod scenario;

use std::path::PathBuf;

use colony_core::{ColonyConfig, LoggingConfig};
use colony_world::WorldView;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scenario::Scenario;

/// Environment variable naming an alternative config file.
const CONFIG_ENV: &str = "COLONY_CONFIG";

/// Config file read when `COLONY_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "colony-config.yaml";

/// Ticks between progress reports.
const REPORT_INTERVAL: u64 = 50;

/// Running totals over the whole tick loop.
#[derive(Debug, Default)]
struct Totals {
    matched: u32,
    completed: u32,
    cancelled: u32,
    anomalies: u32,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, scenario construction, or the tick
/// loop fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, loaded_from) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("colony-engine starting");
    match &loaded_from {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        ticks = config.scenario.ticks,
        seed = config.scenario.seed,
        haulers = config.scenario.haulers,
        hauler_capacity = config.scenario.hauler_capacity,
        workers = config.scenario.workers,
        chain_requests = config.logistics.chain_requests,
        "Scenario settings"
    );

    // 3. Build the scenario.
    let mut scenario = Scenario::build(&config)?;

    // 4. Run the tick loop.
    let mut totals = Totals::default();
    for _ in 0..config.scenario.ticks {
        let summary = scenario.step()?;
        totals.matched = totals.matched.saturating_add(summary.plan.matched);
        totals.completed = totals.completed.saturating_add(summary.logistics.completed);
        totals.cancelled = totals.cancelled.saturating_add(summary.logistics.cancelled);
        if !summary.is_balanced() {
            totals.anomalies = totals.anomalies.saturating_add(1);
        }
        if summary.tick.checked_rem(REPORT_INTERVAL) == Some(0) {
            info!(
                tick = summary.tick,
                active_routes = summary.logistics.active,
                pending_requests = summary.pending_requests,
                sources = summary.sources,
                spawn = scenario.world.used_capacity(scenario.spawn.id),
                tower = scenario.world.used_capacity(scenario.tower.id),
                storage = scenario.world.used_capacity(scenario.storage.id),
                "Progress"
            );
        }
    }

    // 5. Snapshot and report.
    let snapshot = serde_json::to_string(scenario.colony.logistics()).map_err(EngineError::from)?;
    info!(bytes = snapshot.len(), "Logistics state snapshot taken");
    if totals.anomalies > 0 {
        warn!(anomalies = totals.anomalies, "Reservation audit failed during the run");
    }
    info!(
        ticks = config.scenario.ticks,
        haulers = scenario.haulers.len(),
        workers = scenario.workers.len(),
        routes_matched = totals.matched,
        routes_completed = totals.completed,
        routes_cancelled = totals.cancelled,
        container = scenario.world.used_capacity(scenario.container.id),
        storage = scenario.world.used_capacity(scenario.storage.id),
        "colony-engine finished"
    );
    Ok(())
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load configuration from `$COLONY_CONFIG`, or from `colony-config.yaml`
/// in the working directory.
///
/// An explicitly named file must exist. Without one, a missing default
/// file falls back to built-in defaults. Returns the path actually read.
fn load_config() -> Result<(ColonyConfig, Option<PathBuf>), EngineError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
        let config = ColonyConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }
    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = ColonyConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((ColonyConfig::default(), None))
    }
}
