//! Concrete prerequisites.
//!
//! | Prerequisite | Met when | To meet |
//! |---|---|---|
//! | [`MustHaveEnergy`] | unit holds `min(quantity, capacity)` | withdraw from any stocked container in the zone |
//! | [`MustHaveCarryCapacity`] | unit has free capacity | unmeetable |
//! | [`MustBeAdjacent`] | unit is within `range` of the position | travel there |
//! | [`MustHaveWorkParts`] | unit has at least one work part | unmeetable |

use colony_types::Position;
use colony_world::WorldView;

use crate::action::TaskAction;
use crate::minion::SpeculativeMinion;
use crate::prerequisite::TaskPrerequisite;
use crate::types::{TravelTask, WithdrawTask};

/// The unit must carry energy: a full tank or at least `quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MustHaveEnergy {
    /// Energy required.
    pub quantity: u32,
}

impl MustHaveEnergy {
    /// Require `quantity` energy.
    pub const fn new(quantity: u32) -> Self {
        Self { quantity }
    }
}

impl TaskPrerequisite for MustHaveEnergy {
    fn met(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> bool {
        self.quantity > 0
            && minion.capacity > 0
            && minion.capacity_used >= self.quantity.min(minion.capacity)
    }

    fn to_meet(&self, minion: &SpeculativeMinion, view: &dyn WorldView) -> Option<Vec<Box<dyn TaskAction>>> {
        if minion.capacity == 0 {
            return None;
        }
        let tasks = view
            .entities_in_zone(minion.pos.zone)
            .into_iter()
            .filter(|e| e.kind.is_logistics_container() && e.store.used > 0)
            .map(|e| Box::new(WithdrawTask::new(e.id, e.pos)) as Box<dyn TaskAction>)
            .collect();
        Some(tasks)
    }
}

/// The unit must have room to carry more energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MustHaveCarryCapacity;

impl TaskPrerequisite for MustHaveCarryCapacity {
    fn met(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> bool {
        minion.free() > 0
    }

    fn to_meet(&self, _minion: &SpeculativeMinion, _view: &dyn WorldView) -> Option<Vec<Box<dyn TaskAction>>> {
        None
    }
}

/// The unit must stand within `range` of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MustBeAdjacent {
    /// Position to be near.
    pub pos: Position,
    /// Acceptable range.
    pub range: u32,
}

impl MustBeAdjacent {
    /// Require being within `range` of `pos`.
    pub const fn new(pos: Position, range: u32) -> Self {
        Self { pos, range }
    }
}

impl TaskPrerequisite for MustBeAdjacent {
    fn met(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> bool {
        minion.pos.in_range_to(self.pos, self.range)
    }

    fn to_meet(&self, _minion: &SpeculativeMinion, _view: &dyn WorldView) -> Option<Vec<Box<dyn TaskAction>>> {
        Some(vec![Box::new(TravelTask::new(self.pos, self.range))])
    }
}

/// The unit must be able to harvest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MustHaveWorkParts;

impl TaskPrerequisite for MustHaveWorkParts {
    fn met(&self, minion: &SpeculativeMinion, _view: &dyn WorldView) -> bool {
        minion.work_parts > 0
    }

    fn to_meet(&self, _minion: &SpeculativeMinion, _view: &dyn WorldView) -> Option<Vec<Box<dyn TaskAction>>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::{EntityId, ZoneId};
    use colony_world::{Entity, EntityKind, SnapshotWorld, Store};

    const HOME: ZoneId = ZoneId::new(0, 0);

    fn minion(capacity: u32, used: u32) -> SpeculativeMinion {
        SpeculativeMinion {
            unit: EntityId::new(),
            pos: Position::new(HOME, 10, 10),
            capacity,
            capacity_used: used,
            work_parts: 0,
            output: 0,
        }
    }

    #[test]
    fn energy_met_by_full_tank_or_quantity() {
        let world = SnapshotWorld::new();
        assert!(MustHaveEnergy::new(30).met(&minion(50, 30), &world));
        assert!(MustHaveEnergy::new(500).met(&minion(50, 50), &world));
        assert!(!MustHaveEnergy::new(30).met(&minion(50, 10), &world));
        assert!(!MustHaveEnergy::new(0).met(&minion(50, 50), &world));
        assert!(!MustHaveEnergy::new(10).met(&minion(0, 0), &world));
    }

    #[test]
    fn energy_offers_withdraw_from_stocked_containers() {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let _ = world.add_entity(Entity::new(
            "full",
            EntityKind::Container,
            Position::new(HOME, 5, 5),
            Store::new(100, 2000),
        ));
        let _ = world.add_entity(Entity::new(
            "empty",
            EntityKind::Container,
            Position::new(HOME, 6, 6),
            Store::empty(2000),
        ));
        let offered = MustHaveEnergy::new(50).to_meet(&minion(50, 0), &world);
        assert_eq!(offered.map(|tasks| tasks.len()), Some(1));
        assert!(MustHaveEnergy::new(50).to_meet(&minion(0, 0), &world).is_none());
    }

    #[test]
    fn carry_capacity_is_unmeetable() {
        let world = SnapshotWorld::new();
        assert!(MustHaveCarryCapacity.met(&minion(50, 10), &world));
        assert!(!MustHaveCarryCapacity.met(&minion(50, 50), &world));
        assert!(MustHaveCarryCapacity.to_meet(&minion(50, 50), &world).is_none());
    }

    #[test]
    fn adjacency_offers_travel() {
        let world = SnapshotWorld::new();
        let prereq = MustBeAdjacent::new(Position::new(HOME, 20, 20), 1);
        assert!(!prereq.met(&minion(50, 0), &world));
        let tasks = prereq.to_meet(&minion(50, 0), &world).unwrap_or_default();
        assert_eq!(tasks.first().map(|t| t.name()), Some("travel"));
    }
}
