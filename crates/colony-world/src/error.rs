//! Error types for the `colony-world` crate.
//!
//! These cover faults in building or mutating a world snapshot. In-game
//! command outcomes are reported as [`ResultCode`] values instead.
//!
//! [`ResultCode`]: colony_types::ResultCode

use colony_types::{EntityId, ZoneId};

/// Errors that can occur while building or advancing a world snapshot.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An entity was not found in the snapshot.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A zone was not found in the snapshot.
    #[error("zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// A duplicate entity was inserted where uniqueness is required.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// A duplicate zone was inserted where uniqueness is required.
    #[error("duplicate zone: {0}")]
    DuplicateZone(ZoneId),

    /// The tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}
