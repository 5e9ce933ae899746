//! The colony tick: one pass of every subsystem over the live world.
//!
//! Each call to [`Colony::run_tick`] runs these phases in order:
//!
//! 1. **Wake** -- drop cached movement routes of units that no longer
//!    exist.
//! 2. **Match** -- the logistics scheduler refreshes its sources, files the
//!    standing storage resupply request, and pairs idle carriers with
//!    pending requests.
//! 3. **Haul** -- every logistics route advances one step; finished routes
//!    retire and their requests are collected.
//! 4. **Work** -- every worker with a queued plan runs its head action.
//! 5. **Audit** -- source reservations and request promises are checked
//!    against the live routes. A mismatch is logged and reported in the
//!    [`TickSummary`]; it never aborts the tick.
//!
//! Carriers and workers are disjoint: a unit is either driven by the
//! logistics scheduler or by a task plan, never both.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use colony_logistics::{
    AuditResult, LogisticsError, LogisticsManager, LogisticsRequest, PlanReport, ReservationAnomaly, RunReport, audit,
};
use colony_tasks::{QueueReport, ResolverLimits, SpeculativeMinion, TaskAction, TaskQueue, best_plan};
use colony_types::{EntityId, RequestId};
use colony_world::{Movement, World, WorldView};

use crate::config::ColonyConfig;

/// Errors that can occur while managing the colony.
#[derive(Debug, thiserror::Error)]
pub enum ColonyError {
    /// A logistics operation failed.
    #[error("logistics error: {source}")]
    Logistics {
        /// The underlying logistics error.
        #[from]
        source: LogisticsError,
    },

    /// The entity does not exist or is not a mobile unit.
    #[error("entity {0} is not a unit")]
    NotAUnit(EntityId),

    /// The unit already serves in the other role.
    #[error("unit {0} is already registered in another role")]
    RoleConflict(EntityId),

    /// The unit is not a registered worker.
    #[error("unit {0} is not a worker")]
    UnknownWorker(EntityId),
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// Outcome of carrier matching.
    pub plan: PlanReport,
    /// Outcome of advancing logistics routes.
    pub logistics: RunReport,
    /// Outcome of running worker plans.
    pub tasks: QueueReport,
    /// Known logistics sources at end of tick.
    pub sources: u32,
    /// Requests still waiting for a carrier at end of tick.
    pub pending_requests: u32,
    /// Reservation mismatches found by the audit, if any.
    pub anomaly: Option<ReservationAnomaly>,
}

impl TickSummary {
    /// Whether the reservation audit passed.
    pub const fn is_balanced(&self) -> bool {
        self.anomaly.is_none()
    }
}

/// Logistics, movement, and task planning for one colony.
#[derive(Debug)]
pub struct Colony {
    logistics: LogisticsManager,
    movement: Movement,
    tasks: TaskQueue,
    limits: ResolverLimits,
    workers: BTreeSet<EntityId>,
}

impl Colony {
    /// Build a colony with no units from `config`.
    pub fn new(config: &ColonyConfig) -> Self {
        Self {
            logistics: LogisticsManager::new(config.logistics),
            movement: Movement::new(config.movement.clone()),
            tasks: TaskQueue::new(),
            limits: config.resolver.clone(),
            workers: BTreeSet::new(),
        }
    }

    /// The logistics scheduler.
    pub const fn logistics(&self) -> &LogisticsManager {
        &self.logistics
    }

    /// The logistics scheduler, mutably. Used to restore a persisted
    /// manager.
    pub const fn logistics_mut(&mut self) -> &mut LogisticsManager {
        &mut self.logistics
    }

    /// The movement primitive.
    pub const fn movement(&self) -> &Movement {
        &self.movement
    }

    /// Worker task plans.
    pub const fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Registered workers.
    pub const fn workers(&self) -> &BTreeSet<EntityId> {
        &self.workers
    }

    /// Register `unit` as a logistics carrier.
    pub fn add_carrier<V: WorldView + ?Sized>(&mut self, view: &V, unit: EntityId) -> Result<bool, ColonyError> {
        ensure_unit(view, unit)?;
        if self.workers.contains(&unit) {
            return Err(ColonyError::RoleConflict(unit));
        }
        Ok(self.logistics.add_carrier(unit))
    }

    /// Register `unit` as a worker driven by task plans.
    pub fn add_worker<V: WorldView + ?Sized>(&mut self, view: &V, unit: EntityId) -> Result<bool, ColonyError> {
        ensure_unit(view, unit)?;
        if self.logistics.carriers().contains(&unit) {
            return Err(ColonyError::RoleConflict(unit));
        }
        Ok(self.workers.insert(unit))
    }

    /// Release `unit` from whichever role it serves, cancelling its route
    /// or plan.
    pub fn remove_unit(&mut self, unit: EntityId) -> Result<(), ColonyError> {
        self.movement.forget(unit);
        if self.workers.remove(&unit) {
            self.tasks.cancel(unit);
            return Ok(());
        }
        self.logistics.remove_carrier(unit)?;
        Ok(())
    }

    /// File a logistics request under `key`.
    pub fn submit(&mut self, key: impl Into<String>, request: LogisticsRequest) -> Result<RequestId, ColonyError> {
        Ok(self.logistics.submit(key, request)?)
    }

    /// Workers that exist in the world and have no queued plan.
    pub fn idle_workers<V: WorldView + ?Sized>(&self, view: &V) -> Vec<EntityId> {
        self.workers
            .iter()
            .copied()
            .filter(|&unit| self.tasks.is_idle(unit) && view.entity(unit).is_some())
            .collect()
    }

    /// Plan `goal` for the idle worker that can reach it most cheaply.
    /// Returns the chosen worker, or `None` when no idle worker has a plan.
    pub fn assign_goal<V: WorldView>(&mut self, view: &V, goal: &dyn TaskAction) -> Option<EntityId> {
        let minions: Vec<SpeculativeMinion> = self
            .idle_workers(view)
            .into_iter()
            .filter_map(|unit| SpeculativeMinion::of(view, unit))
            .collect();
        let Some((unit, plan)) = best_plan(&minions, goal, view, &self.limits) else {
            debug!(goal = goal.name(), candidates = minions.len(), "no worker can reach goal");
            return None;
        };
        self.tasks.assign(unit, plan);
        Some(unit)
    }

    /// Plan `goal` for a specific worker, replacing its current plan.
    /// Returns whether a plan was found.
    pub fn assign_goal_to<V: WorldView>(
        &mut self,
        view: &V,
        unit: EntityId,
        goal: &dyn TaskAction,
    ) -> Result<bool, ColonyError> {
        if !self.workers.contains(&unit) {
            return Err(ColonyError::UnknownWorker(unit));
        }
        let Some(minion) = SpeculativeMinion::of(view, unit) else {
            return Err(ColonyError::NotAUnit(unit));
        };
        match best_plan(&[minion], goal, view, &self.limits) {
            Some((unit, plan)) => {
                self.tasks.assign(unit, plan);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one tick of every subsystem against `world`.
    pub fn run_tick<W: World>(&mut self, world: &mut W) -> TickSummary {
        let tick = world.tick();

        // 1. Wake.
        self.movement.prune(&*world);

        // 2. Match.
        let plan = self.logistics.plan(&*world);

        // 3. Haul.
        let logistics = self.logistics.run(world, &mut self.movement);

        // 4. Work.
        let tasks = self.tasks.run(world, &mut self.movement);

        // 5. Audit.
        let anomaly = match audit(tick, &self.logistics) {
            AuditResult::Balanced => None,
            AuditResult::Anomaly(anomaly) => {
                warn!(
                    tick,
                    sources = anomaly.sources.len(),
                    requests = anomaly.requests.len(),
                    overcommitted = anomaly.overcommitted.len(),
                    message = %anomaly.message,
                    "reservation audit failed"
                );
                Some(anomaly)
            }
        };

        let summary = TickSummary {
            tick,
            plan,
            logistics,
            tasks,
            sources: u32::try_from(self.logistics.book().sources().count()).unwrap_or(u32::MAX),
            pending_requests: u32::try_from(self.logistics.book().pending().len()).unwrap_or(u32::MAX),
            anomaly,
        };
        if summary.logistics.completed > 0 || summary.logistics.cancelled > 0 {
            info!(
                tick,
                completed = summary.logistics.completed,
                cancelled = summary.logistics.cancelled,
                active = summary.logistics.active,
                "routes retired"
            );
        }
        debug!(
            tick,
            matched = summary.plan.matched,
            active_routes = summary.logistics.active,
            pending = summary.pending_requests,
            tasks_in_progress = summary.tasks.in_progress,
            "tick complete"
        );
        summary
    }
}

fn ensure_unit<V: WorldView + ?Sized>(view: &V, unit: EntityId) -> Result<(), ColonyError> {
    if view.entity(unit).is_some_and(|e| e.kind.is_unit()) {
        Ok(())
    } else {
        Err(ColonyError::NotAUnit(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_tasks::HarvestTask;
    use colony_types::{Position, ZoneId};
    use colony_world::{Entity, EntityKind, SnapshotWorld, Store};

    const HOME: ZoneId = ZoneId::new(0, 0);

    struct Fixture {
        world: SnapshotWorld,
        colony: Colony,
        source: EntityId,
        spawn: EntityId,
    }

    fn fixture() -> Fixture {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let source = world
            .add_entity(Entity::new(
                "source",
                EntityKind::EnergySource,
                Position::new(HOME, 25, 25),
                Store::new(3000, 3000),
            ))
            .unwrap_or_default();
        let _ = world.add_entity(Entity::new(
            "container",
            EntityKind::Container,
            Position::new(HOME, 26, 25),
            Store::new(500, 2000),
        ));
        let spawn = world
            .add_entity(Entity::new("spawn", EntityKind::Spawn, Position::new(HOME, 30, 25), Store::empty(100)))
            .unwrap_or_default();
        Fixture {
            world,
            colony: Colony::new(&ColonyConfig::default()),
            source,
            spawn,
        }
    }

    fn add_unit(world: &mut SnapshotWorld, x: u8, capacity: u32, work: u32) -> EntityId {
        world
            .add_entity(Entity::unit("unit", Position::new(HOME, x, 20), capacity, work))
            .unwrap_or_default()
    }

    #[test]
    fn roles_are_disjoint() {
        let mut f = fixture();
        let unit = add_unit(&mut f.world, 20, 50, 1);
        assert!(f.colony.add_carrier(&f.world, unit).is_ok_and(|new| new));
        assert!(matches!(
            f.colony.add_worker(&f.world, unit),
            Err(ColonyError::RoleConflict(id)) if id == unit
        ));
        assert!(matches!(
            f.colony.add_carrier(&f.world, f.spawn),
            Err(ColonyError::NotAUnit(_))
        ));
    }

    #[test]
    fn remove_unit_cancels_route() {
        let mut f = fixture();
        let unit = add_unit(&mut f.world, 20, 50, 0);
        let _ = f.colony.add_carrier(&f.world, unit);
        let _ = f
            .colony
            .submit("spawn", LogisticsRequest::transfer(f.spawn, Position::new(HOME, 30, 25), 50, 1, 0));
        let summary = f.colony.run_tick(&mut f.world);
        assert_eq!(summary.plan.matched, 1);
        assert!(f.colony.logistics().route(unit).is_some());

        assert!(f.colony.remove_unit(unit).is_ok());
        assert!(f.colony.logistics().routes().is_empty());
        assert!(f.colony.logistics().book().sources().all(|s| s.reserved_capacity == 0));
        assert!(matches!(
            f.colony.remove_unit(unit),
            Err(ColonyError::Logistics { .. })
        ));
    }

    #[test]
    fn empty_request_is_rejected() {
        let mut f = fixture();
        let result = f
            .colony
            .submit("spawn", LogisticsRequest::transfer(f.spawn, Position::new(HOME, 30, 25), 0, 1, 0));
        assert!(matches!(result, Err(ColonyError::Logistics { .. })));
    }

    #[test]
    fn goal_goes_to_cheapest_worker() {
        let mut f = fixture();
        let far = add_unit(&mut f.world, 5, 50, 2);
        let near = add_unit(&mut f.world, 24, 50, 2);
        let _ = f.colony.add_worker(&f.world, far);
        let _ = f.colony.add_worker(&f.world, near);

        let goal = HarvestTask::new(f.source, Position::new(HOME, 25, 25));
        assert_eq!(f.colony.assign_goal(&f.world, &goal), Some(near));
        assert_eq!(f.colony.idle_workers(&f.world), vec![far]);
        assert_eq!(f.colony.tasks().remaining(near), 2);
    }

    #[test]
    fn goal_without_capable_worker_is_unassigned() {
        let mut f = fixture();
        let idle = add_unit(&mut f.world, 20, 50, 0);
        let _ = f.colony.add_worker(&f.world, idle);
        let goal = HarvestTask::new(f.source, Position::new(HOME, 25, 25));
        assert_eq!(f.colony.assign_goal(&f.world, &goal), None);
        assert!(matches!(f.colony.assign_goal_to(&f.world, idle, &goal), Ok(false)));
        assert!(matches!(
            f.colony.assign_goal_to(&f.world, f.spawn, &goal),
            Err(ColonyError::UnknownWorker(_))
        ));
    }

    #[test]
    fn tick_runs_worker_plans_and_deliveries() {
        let mut f = fixture();
        let hauler = add_unit(&mut f.world, 28, 50, 0);
        let worker = add_unit(&mut f.world, 24, 50, 2);
        let _ = f.colony.add_carrier(&f.world, hauler);
        let _ = f.colony.add_worker(&f.world, worker);
        let _ = f
            .colony
            .submit("spawn", LogisticsRequest::transfer(f.spawn, Position::new(HOME, 30, 25), 50, 1, 0));
        let goal = HarvestTask::new(f.source, Position::new(HOME, 25, 25));
        assert!(f.colony.assign_goal(&f.world, &goal).is_some());

        for _ in 0..30 {
            let summary = f.colony.run_tick(&mut f.world);
            assert!(summary.is_balanced());
            let _ = f.world.advance_tick();
        }
        assert_eq!(f.world.used_capacity(f.spawn), 50);
        assert!(f.world.used_capacity(worker) > 0);
        assert!(f.colony.logistics().routes().is_empty());
    }
}
