//! Capability query layer, pathfinding, and movement for the colony core.
//!
//! The core never talks to live game objects directly. It consumes the
//! world through two traits: [`WorldView`] for read-only snapshot queries
//! and [`World`] for the handful of commands a unit can issue in a tick.
//! [`SnapshotWorld`] is the in-memory implementation used by tests and the
//! demo engine.
//!
//! # Modules
//!
//! - [`analyst`] -- Position helpers: logistics containers around a tile,
//!   walkable positions in range.
//! - [`cache`] -- [`TickCache`], explicit per-tick memoization.
//! - [`entity`] -- [`Entity`], [`EntityKind`], [`Store`], [`Terrain`].
//! - [`error`] -- Error types for world operations.
//! - [`movement`] -- The movement primitive: cached per-unit routes with
//!   stuck detection, bounded recomputation, and edge-of-zone stepping.
//! - [`pathfinding`] -- [`PathFinder`] trait and the A* [`GridPathFinder`].
//! - [`query`] -- The [`WorldView`] and [`World`] traits.
//! - [`snapshot`] -- [`SnapshotWorld`], an in-memory world.
//! - [`zone_route`] -- Zone-level routing that avoids hostile zones.

pub mod analyst;
pub mod cache;
pub mod entity;
pub mod error;
pub mod movement;
pub mod pathfinding;
pub mod query;
pub mod snapshot;
pub mod zone_route;

// Re-export primary types at crate root.
pub use cache::TickCache;
pub use entity::{Entity, EntityKind, Store, Terrain};
pub use error::WorldError;
pub use movement::{MoveRoute, Movement, MovementConfig};
pub use pathfinding::{CostMatrix, GridPathFinder, PathFinder, PathSearchOptions, PathSearchResult};
pub use query::{World, WorldView};
pub use snapshot::SnapshotWorld;
pub use zone_route::find_zone_route;
