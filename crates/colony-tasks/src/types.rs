//! Concrete tasks.
//!
//! Each task keeps the stable identifier of its target and the target's
//! position, so prerequisites can be built without touching the world.
//! Targets are re-resolved through the world on every call.

use colony_types::{EntityId, Position, ResultCode, TaskActionResult};
use colony_world::{EntityKind, WorldView};

use crate::action::{ActionContext, TaskAction};
use crate::minion::SpeculativeMinion;
use crate::prereqs::{MustBeAdjacent, MustHaveCarryCapacity, MustHaveEnergy, MustHaveWorkParts};
use crate::prerequisite::TaskPrerequisite;

/// Energy harvested per work part per tick.
const HARVEST_PER_WORK_PART: u32 = 2;

/// Walk until within `range` of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelTask {
    /// Destination.
    pub target: Position,
    /// Acceptable distance from the destination.
    pub range: u32,
}

impl TravelTask {
    /// Travel to within `range` of `target`.
    pub const fn new(target: Position, range: u32) -> Self {
        Self { target, range }
    }
}

impl TaskAction for TravelTask {
    fn name(&self) -> &'static str {
        "travel"
    }

    fn cost(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> f64 {
        f64::from(minion.pos.range_to(self.target).saturating_sub(self.range))
    }

    fn predict(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> SpeculativeMinion {
        SpeculativeMinion {
            pos: self.target,
            ..minion.clone()
        }
    }

    fn action(&mut self, unit: EntityId, ctx: &mut ActionContext<'_>) -> TaskActionResult {
        ctx.movement.move_to(&mut *ctx.world, unit, self.target, self.range)
    }

    fn boxed_clone(&self) -> Box<dyn TaskAction> {
        Box::new(*self)
    }
}

/// Harvest an energy source until the unit is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestTask {
    /// The energy source.
    pub source: EntityId,
    /// Where the source is.
    pub pos: Position,
}

impl HarvestTask {
    /// Harvest the source `source` located at `pos`.
    pub const fn new(source: EntityId, pos: Position) -> Self {
        Self { source, pos }
    }
}

impl TaskAction for HarvestTask {
    fn name(&self) -> &'static str {
        "harvest"
    }

    fn valid(&self, view: &dyn WorldView) -> bool {
        view.entity(self.source)
            .is_some_and(|e| e.kind == EntityKind::EnergySource)
    }

    fn prerequisites(&self) -> Vec<Box<dyn TaskPrerequisite>> {
        vec![
            Box::new(MustHaveWorkParts),
            Box::new(MustBeAdjacent::new(self.pos, 1)),
        ]
    }

    fn cost(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> f64 {
        let rate = minion.work_parts.saturating_mul(HARVEST_PER_WORK_PART);
        if rate == 0 {
            return f64::INFINITY;
        }
        1.0 / f64::from(rate)
    }

    fn predict(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> SpeculativeMinion {
        SpeculativeMinion {
            capacity_used: minion.capacity,
            ..minion.clone()
        }
    }

    fn action(&mut self, unit: EntityId, ctx: &mut ActionContext<'_>) -> TaskActionResult {
        match ctx.world.harvest(unit, self.source) {
            ResultCode::ErrNotInRange | ResultCode::ErrNotFound | ResultCode::ErrInvalidTarget => {
                return TaskActionResult::Failed;
            }
            _ => {}
        }
        let Some(entity) = ctx.world.entity(unit) else {
            return TaskActionResult::Failed;
        };
        if entity.store.capacity > 0 {
            if entity.store.free() == 0 {
                return TaskActionResult::Success;
            }
            return TaskActionResult::InProgress;
        }
        // A unit that cannot carry drops into a container under it.
        let has_room = ctx
            .world
            .entities_near(entity.pos, 0)
            .into_iter()
            .any(|e| e.kind == EntityKind::Container && e.store.free() > 0);
        if has_room {
            TaskActionResult::InProgress
        } else {
            TaskActionResult::Failed
        }
    }

    fn boxed_clone(&self) -> Box<dyn TaskAction> {
        Box::new(*self)
    }
}

/// Take energy from a container, storage, link, or dropped pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawTask {
    /// The container.
    pub source: EntityId,
    /// Where the container is.
    pub pos: Position,
}

impl WithdrawTask {
    /// Withdraw from `source` located at `pos`.
    pub const fn new(source: EntityId, pos: Position) -> Self {
        Self { source, pos }
    }
}

impl TaskAction for WithdrawTask {
    fn name(&self) -> &'static str {
        "withdraw"
    }

    fn valid(&self, view: &dyn WorldView) -> bool {
        view.entity(self.source)
            .is_some_and(|e| e.kind.is_logistics_container() && e.store.used > 0)
    }

    fn prerequisites(&self) -> Vec<Box<dyn TaskPrerequisite>> {
        vec![
            Box::new(MustHaveCarryCapacity),
            Box::new(MustBeAdjacent::new(self.pos, 1)),
        ]
    }

    fn predict(&self, minion: &SpeculativeMinion, view: &dyn WorldView) -> SpeculativeMinion {
        let available = view.used_capacity(self.source);
        SpeculativeMinion {
            capacity_used: minion
                .capacity_used
                .saturating_add(available)
                .min(minion.capacity),
            ..minion.clone()
        }
    }

    fn action(&mut self, unit: EntityId, ctx: &mut ActionContext<'_>) -> TaskActionResult {
        let Some(kind) = ctx.world.entity(self.source).map(|e| e.kind) else {
            return TaskActionResult::Failed;
        };
        let code = if kind == EntityKind::DroppedEnergy {
            ctx.world.pickup(unit, self.source)
        } else {
            ctx.world.withdraw(unit, self.source, None)
        };
        match code {
            ResultCode::Ok | ResultCode::ErrFull => TaskActionResult::Success,
            _ => TaskActionResult::Failed,
        }
    }

    fn boxed_clone(&self) -> Box<dyn TaskAction> {
        Box::new(*self)
    }
}

/// Deliver energy into a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTask {
    /// The receiving structure.
    pub target: EntityId,
    /// Where the structure is.
    pub pos: Position,
    /// Energy to deliver.
    pub quantity: u32,
}

impl TransferTask {
    /// Deliver `quantity` energy to `target` located at `pos`.
    pub const fn new(target: EntityId, pos: Position, quantity: u32) -> Self {
        Self { target, pos, quantity }
    }
}

impl TaskAction for TransferTask {
    fn name(&self) -> &'static str {
        "transfer"
    }

    fn valid(&self, view: &dyn WorldView) -> bool {
        view.entity(self.target)
            .is_some_and(|e| e.kind.accepts_energy() && e.store.free() > 0)
    }

    fn prerequisites(&self) -> Vec<Box<dyn TaskPrerequisite>> {
        vec![
            Box::new(MustHaveEnergy::new(self.quantity)),
            Box::new(MustBeAdjacent::new(self.pos, 1)),
        ]
    }

    fn predict(&self, minion: &SpeculativeMinion, view: &dyn WorldView) -> SpeculativeMinion {
        let delivered = minion
            .capacity_used
            .min(self.quantity)
            .min(view.free_capacity(self.target));
        SpeculativeMinion {
            capacity_used: minion.capacity_used.saturating_sub(delivered),
            output: minion.output.saturating_add(delivered),
            ..minion.clone()
        }
    }

    fn action(&mut self, unit: EntityId, ctx: &mut ActionContext<'_>) -> TaskActionResult {
        let held = ctx.world.used_capacity(unit);
        let room = ctx.world.free_capacity(self.target);
        let amount = held.min(room).min(self.quantity);
        if amount == 0 {
            return TaskActionResult::Failed;
        }
        match ctx.world.transfer(unit, self.target, Some(amount)) {
            ResultCode::Ok | ResultCode::ErrFull => TaskActionResult::Success,
            _ => TaskActionResult::Failed,
        }
    }

    fn boxed_clone(&self) -> Box<dyn TaskAction> {
        Box::new(*self)
    }
}
