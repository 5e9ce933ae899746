//! Result codes for world commands and task actions.

use serde::{Deserialize, Serialize};

/// Outcome of a single world command (move, withdraw, transfer, ...).
///
/// These are game outcomes, not Rust errors: a unit being out of range or a
/// container running dry is an expected condition the caller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// The command was accepted.
    Ok,
    /// The target is too far away to interact with.
    ErrNotInRange,
    /// There is not enough energy to complete the command.
    ErrNotEnoughResources,
    /// A referenced entity or path step could not be found.
    ErrNotFound,
    /// No path to the target exists (or the recompute budget is spent).
    ErrNoPath,
    /// The unit is fatigued and cannot move this tick.
    ErrTired,
    /// The target has no free capacity.
    ErrFull,
    /// The target cannot be used for this command.
    ErrInvalidTarget,
}

impl ResultCode {
    /// Whether this is [`ResultCode::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl core::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::ErrNotInRange => "ERR_NOT_IN_RANGE",
            Self::ErrNotEnoughResources => "ERR_NOT_ENOUGH_RESOURCES",
            Self::ErrNotFound => "ERR_NOT_FOUND",
            Self::ErrNoPath => "ERR_NO_PATH",
            Self::ErrTired => "ERR_TIRED",
            Self::ErrFull => "ERR_FULL",
            Self::ErrInvalidTarget => "ERR_INVALID_TARGET",
        };
        f.write_str(s)
    }
}

/// Outcome of performing one step of a task action or behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskActionResult {
    /// The action finished; move on to the next one.
    Success,
    /// The action cannot be completed; abandon the plan.
    Failed,
    /// The action is still running; invoke it again next tick.
    InProgress,
}
