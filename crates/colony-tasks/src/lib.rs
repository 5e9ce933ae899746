//! Prerequisite protocol, task tree resolver, and task queue.
//!
//! A unit of work is a [`TaskAction`]. Actions declare
//! [`TaskPrerequisite`]s; a prerequisite that is not met for a candidate
//! unit offers alternative actions that would meet it. The resolver
//! expands those alternatives into every costed [`TaskPlan`] that reaches
//! the goal and ranks them cheapest first.
//!
//! All evaluation happens against a [`SpeculativeMinion`], a detached copy
//! of a unit's state, so "what-if" reasoning never touches the real unit.
//!
//! # Modules
//!
//! - [`action`] -- The [`TaskAction`] trait and [`ActionContext`].
//! - [`minion`] -- [`SpeculativeMinion`], the projected unit state.
//! - [`prerequisite`] -- The [`TaskPrerequisite`] trait.
//! - [`prereqs`] -- Concrete prerequisites (energy, carry capacity,
//!   adjacency, work parts).
//! - [`queue`] -- [`TaskQueue`] and [`best_plan`]: choosing and executing
//!   plans tick by tick.
//! - [`resolver`] -- [`resolve_task_trees`] and [`TaskPlan`].
//! - [`types`] -- Concrete tasks (travel, harvest, withdraw, transfer).

pub mod action;
pub mod minion;
pub mod prereqs;
pub mod prerequisite;
pub mod queue;
pub mod resolver;
pub mod types;

// Re-export primary types at crate root.
pub use action::{ActionContext, TaskAction};
pub use minion::SpeculativeMinion;
pub use prereqs::{MustBeAdjacent, MustHaveCarryCapacity, MustHaveEnergy, MustHaveWorkParts};
pub use prerequisite::TaskPrerequisite;
pub use queue::{QueueReport, TaskQueue, best_plan};
pub use resolver::{ResolverLimits, TaskPlan, resolve_task_trees};
pub use types::{HarvestTask, TransferTask, TravelTask, WithdrawTask};
