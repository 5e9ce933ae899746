//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the tick loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colony_core::ConfigError,
    },

    /// Building or advancing the world failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: colony_world::WorldError,
    },

    /// Registering units or requests with the colony failed.
    #[error("colony error: {source}")]
    Colony {
        /// The underlying colony error.
        #[from]
        source: colony_core::ColonyError,
    },

    /// Snapshotting the logistics state failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The scenario settings cannot produce a world.
    #[error("scenario error: {message}")]
    Scenario {
        /// Description of the problem.
        message: String,
    },
}
