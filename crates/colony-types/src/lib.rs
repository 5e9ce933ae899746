//! Shared type definitions for the colony agent-control core.
//!
//! This crate is the single source of truth for the primitive values that
//! flow between the world, task, and logistics crates. Everything here is
//! plain data: identifiers, positions, directions, and the result codes
//! returned by in-game commands. All of it serializes, so any state built
//! from these types can be persisted between ticks and reattached.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity and request identifiers
//! - [`position`] -- Zones, positions, ranges, and movement directions
//! - [`enums`] -- Command result codes and task action results

pub mod enums;
pub mod ids;
pub mod position;

// Re-export all public types at crate root for convenience.
pub use enums::{ResultCode, TaskActionResult};
pub use ids::{EntityId, RequestId};
pub use position::{Direction, Position, ZONE_SIZE, ZoneId};
