//! Colony orchestration: typed configuration and the per-tick loop.
//!
//! This crate ties the lower layers together. [`ColonyConfig`] assembles
//! the configuration sections owned by each subsystem, and [`Colony`] runs
//! one tick of logistics matching, route execution, and worker plans
//! against any [`World`] implementation.
//!
//! # Modules
//!
//! - [`colony`] -- [`Colony`], the tick phases, and [`TickSummary`].
//! - [`config`] -- YAML configuration loading and typed config structures.
//!
//! [`World`]: colony_world::World

pub mod colony;
pub mod config;

// Re-export primary types at crate root.
pub use colony::{Colony, ColonyError, TickSummary};
pub use config::{ColonyConfig, ConfigError, LoggingConfig, ScenarioConfig};
