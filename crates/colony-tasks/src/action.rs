//! The task action protocol.
//!
//! A [`TaskAction`] is evaluated in two very different settings:
//!
//! 1. **Planning**, against a [`SpeculativeMinion`] and a read-only
//!    [`WorldView`]: `valid`, `prerequisites`, `cost`, and `predict`.
//! 2. **Execution**, once per tick against the live world through an
//!    [`ActionContext`]: `action`.
//!
//! Actions are stored as `Box<dyn TaskAction>` inside plans and queues, so
//! the trait carries a `boxed_clone` hook that lets plans be copied when
//! the resolver combines alternatives.

use colony_types::{EntityId, TaskActionResult};
use colony_world::{Movement, World, WorldView};

use crate::minion::SpeculativeMinion;
use crate::prerequisite::TaskPrerequisite;

/// Collaborators an action may use while executing.
pub struct ActionContext<'a> {
    /// The live world.
    pub world: &'a mut dyn World,
    /// The shared movement primitive.
    pub movement: &'a mut Movement,
}

impl core::fmt::Debug for ActionContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionContext")
            .field("tick", &self.world.tick())
            .field("movement", &self.movement)
            .finish()
    }
}

/// A unit of work a mobile unit can perform.
pub trait TaskAction: core::fmt::Debug {
    /// Short display name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the action still makes sense (its target exists, etc.).
    fn valid(&self, _view: &dyn WorldView) -> bool {
        true
    }

    /// Preconditions that must hold before the action can run.
    fn prerequisites(&self) -> Vec<Box<dyn TaskPrerequisite>> {
        Vec::new()
    }

    /// Cost of performing the action with `minion`.
    fn cost(&self, _minion: &SpeculativeMinion, _view: &dyn WorldView) -> f64 {
        1.0
    }

    /// Projected state of `minion` after the action completes.
    fn predict(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> SpeculativeMinion {
        minion.clone()
    }

    /// Perform one tick of the action for `unit`.
    fn action(&mut self, unit: EntityId, ctx: &mut ActionContext<'_>) -> TaskActionResult;

    /// Clone into a new box.
    fn boxed_clone(&self) -> Box<dyn TaskAction>;
}

impl Clone for Box<dyn TaskAction> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}
