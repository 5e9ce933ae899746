//! Error types for the `colony-logistics` crate.
//!
//! Route outcomes (ran dry, lost the unit, no path) are not errors: they
//! drive the route state machine. These variants cover misuse of the
//! manager's bookkeeping API.

use colony_types::{EntityId, Position, RequestId};

/// Errors returned by the logistics manager's bookkeeping API.
#[derive(Debug, thiserror::Error)]
pub enum LogisticsError {
    /// A request id did not resolve.
    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// No source is registered at the position.
    #[error("no logistics source at {0}")]
    SourceNotFound(Position),

    /// The unit is not a registered carrier.
    #[error("unit is not a carrier: {0}")]
    NotACarrier(EntityId),

    /// The entity does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A request was submitted with nothing to deliver.
    #[error("request {0} has zero capacity")]
    EmptyRequest(RequestId),
}
