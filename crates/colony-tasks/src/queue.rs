//! Choosing plans and executing them tick by tick.
//!
//! [`best_plan`] resolves a goal for several candidate units and picks the
//! cheapest. [`TaskQueue`] holds the chosen plan per unit and runs the head
//! action once per tick:
//!
//! - `Success` pops the head; the next action runs next tick.
//! - `InProgress` leaves the head in place.
//! - `Failed`, an invalid head action, or a vanished unit abandons the
//!   whole plan.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info};

use colony_types::{EntityId, TaskActionResult};
use colony_world::{Movement, World, WorldView};

use crate::action::{ActionContext, TaskAction};
use crate::minion::SpeculativeMinion;
use crate::resolver::{ResolverLimits, TaskPlan, resolve_task_trees};

/// Resolve `goal` for every candidate and return the cheapest plan.
///
/// Ties go to the earlier candidate.
pub fn best_plan(
    minions: &[SpeculativeMinion],
    goal: &dyn TaskAction,
    view: &dyn WorldView,
    limits: &ResolverLimits,
) -> Option<(EntityId, TaskPlan)> {
    let mut best: Option<(EntityId, TaskPlan)> = None;
    for minion in minions {
        let Some(plan) = resolve_task_trees(minion, goal, view, limits).into_iter().next() else {
            continue;
        };
        let better = best
            .as_ref()
            .is_none_or(|(_, current)| plan.cost.total_cmp(&current.cost).is_lt());
        if better {
            best = Some((minion.unit, plan));
        }
    }
    best
}

/// Counts from one execution pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Actions that finished this tick.
    pub succeeded: u32,
    /// Actions still running.
    pub in_progress: u32,
    /// Plans abandoned this tick.
    pub abandoned: u32,
}

/// Per-unit queues of planned actions.
#[derive(Debug, Default)]
pub struct TaskQueue {
    assignments: BTreeMap<EntityId, VecDeque<Box<dyn TaskAction>>>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever `unit` was doing with `plan`.
    pub fn assign(&mut self, unit: EntityId, plan: TaskPlan) {
        info!(unit = %unit, tasks = ?plan.names(), cost = plan.cost, "plan assigned");
        self.assignments.insert(unit, plan.tasks.into());
    }

    /// Whether `unit` has no queued actions.
    pub fn is_idle(&self, unit: EntityId) -> bool {
        self.assignments.get(&unit).is_none_or(VecDeque::is_empty)
    }

    /// Remaining actions for `unit`.
    pub fn remaining(&self, unit: EntityId) -> usize {
        self.assignments.get(&unit).map_or(0, VecDeque::len)
    }

    /// Drop the plan of `unit`.
    pub fn cancel(&mut self, unit: EntityId) {
        self.assignments.remove(&unit);
    }

    /// Run the head action of every queued plan once.
    pub fn run<W: World>(&mut self, world: &mut W, movement: &mut Movement) -> QueueReport {
        let mut report = QueueReport::default();
        let units: Vec<EntityId> = self.assignments.keys().copied().collect();

        for unit in units {
            let result = self.run_unit(unit, world, movement);
            match result {
                TaskActionResult::Success => report.succeeded = report.succeeded.saturating_add(1),
                TaskActionResult::InProgress => report.in_progress = report.in_progress.saturating_add(1),
                TaskActionResult::Failed => {
                    report.abandoned = report.abandoned.saturating_add(1);
                    debug!(unit = %unit, "plan abandoned");
                    self.assignments.remove(&unit);
                    movement.forget(unit);
                }
            }
            if self.is_idle(unit) {
                self.assignments.remove(&unit);
            }
        }
        report
    }

    fn run_unit<W: World>(&mut self, unit: EntityId, world: &mut W, movement: &mut Movement) -> TaskActionResult {
        if world.entity(unit).is_none() {
            return TaskActionResult::Failed;
        }
        let Some(queue) = self.assignments.get_mut(&unit) else {
            return TaskActionResult::Failed;
        };
        let Some(head) = queue.front_mut() else {
            return TaskActionResult::Success;
        };
        let view: &dyn WorldView = &*world;
        if !head.valid(view) {
            debug!(unit = %unit, task = head.name(), "head action no longer valid");
            return TaskActionResult::Failed;
        }

        let mut ctx = ActionContext { world, movement };
        let result = head.action(unit, &mut ctx);
        if result == TaskActionResult::Success {
            queue.pop_front();
        }
        result
    }
}
