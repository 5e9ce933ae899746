//! Task tree resolution.
//!
//! [`resolve_task_trees`] expands a goal action into every plan that can
//! reach it:
//!
//! 1. An invalid goal yields no plans.
//! 2. Met prerequisites contribute nothing.
//! 3. A prerequisite whose `to_meet` is `None` kills the goal.
//! 4. Otherwise each offered alternative is resolved recursively. An
//!    alternative that resolves to nothing is pruned; if all of them are
//!    pruned the goal has no plans.
//! 5. Per-prerequisite alternatives are combined as a Cartesian product and
//!    the goal is appended to every combination.
//!
//! Every partial combination carries its own projected minion. Appending
//! an action applies its `predict`, so a later prerequisite (and the goal's
//! cost) sees the state the earlier actions would leave behind: a unit
//! that plans to travel is evaluated at the destination, a unit that plans
//! to withdraw is evaluated carrying the energy.
//!
//! Plans are returned cheapest first, ties kept in discovery order.
//! Recursion is bounded by [`ResolverLimits::max_depth`]; running out of
//! depth is treated as "no plan".

use serde::{Deserialize, Serialize};
use tracing::trace;

use colony_world::WorldView;

use crate::action::TaskAction;
use crate::minion::SpeculativeMinion;

/// Bounds on resolver recursion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverLimits {
    /// Maximum nesting of prerequisite actions below the goal.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for ResolverLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

const fn default_max_depth() -> u32 {
    8
}

/// One fully resolved, costed sequence of actions ending in the goal.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    /// Actions in execution order; the goal is last.
    pub tasks: Vec<Box<dyn TaskAction>>,
    /// Sum of the cost of every action.
    pub cost: f64,
    /// Projected unit state once every action has run.
    pub minion: SpeculativeMinion,
}

impl TaskPlan {
    /// Display names of the actions, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

/// Resolve `goal` for `minion` into ranked plans.
pub fn resolve_task_trees(
    minion: &SpeculativeMinion,
    goal: &dyn TaskAction,
    view: &dyn WorldView,
    limits: &ResolverLimits,
) -> Vec<TaskPlan> {
    let mut plans = resolve(minion, goal, view, limits.max_depth);
    plans.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    plans
}

fn resolve(minion: &SpeculativeMinion, goal: &dyn TaskAction, view: &dyn WorldView, depth: u32) -> Vec<TaskPlan> {
    if depth == 0 {
        trace!(goal = goal.name(), unit = %minion.unit, "resolver depth exhausted");
        return Vec::new();
    }
    if !goal.valid(view) {
        return Vec::new();
    }

    // Partial plans share the TaskPlan shape; the goal is not appended yet.
    let mut combinations = vec![TaskPlan {
        tasks: Vec::new(),
        cost: 0.0,
        minion: minion.clone(),
    }];

    for prerequisite in goal.prerequisites() {
        let mut next: Vec<TaskPlan> = Vec::new();
        for partial in combinations {
            if prerequisite.met(&partial.minion, view) {
                next.push(partial);
                continue;
            }
            let Some(alternatives) = prerequisite.to_meet(&partial.minion, view) else {
                trace!(goal = goal.name(), ?prerequisite, "prerequisite cannot be met");
                return Vec::new();
            };
            if alternatives.is_empty() {
                next.push(partial);
                continue;
            }
            for alternative in &alternatives {
                let depth_left = depth.saturating_sub(1);
                for sub in resolve(&partial.minion, alternative.as_ref(), view, depth_left) {
                    let mut tasks = partial.tasks.clone();
                    tasks.extend(sub.tasks);
                    next.push(TaskPlan {
                        tasks,
                        cost: partial.cost + sub.cost,
                        minion: sub.minion,
                    });
                }
            }
        }
        if next.is_empty() {
            return Vec::new();
        }
        combinations = next;
    }

    combinations
        .into_iter()
        .map(|partial| {
            let cost = partial.cost + goal.cost(&partial.minion, view);
            let minion = goal.predict(&partial.minion, view);
            let mut tasks = partial.tasks;
            tasks.push(goal.boxed_clone());
            TaskPlan { tasks, cost, minion }
        })
        .collect()
}
