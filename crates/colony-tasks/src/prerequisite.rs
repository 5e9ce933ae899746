//! The prerequisite protocol.

use colony_world::WorldView;

use crate::action::TaskAction;
use crate::minion::SpeculativeMinion;

/// A precondition gating a [`TaskAction`].
pub trait TaskPrerequisite: core::fmt::Debug {
    /// Whether the precondition already holds for `minion`.
    fn met(&self, minion: &SpeculativeMinion, view: &dyn WorldView) -> bool;

    /// Alternative actions, any one of which would meet the precondition.
    ///
    /// `None` means the precondition cannot be met at all. An empty list
    /// means it is satisfiable without any extra action.
    fn to_meet(&self, minion: &SpeculativeMinion, view: &dyn WorldView) -> Option<Vec<Box<dyn TaskAction>>>;
}
