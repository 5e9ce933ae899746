//! Speculative unit state for "what-if" evaluation.

use serde::{Deserialize, Serialize};

use colony_types::{EntityId, Position};
use colony_world::{Entity, WorldView};

/// A detached projection of a unit's state.
///
/// The resolver threads these through [`TaskAction::predict`] so deeper
/// prerequisite checks see the state a unit *would* have after earlier
/// actions. The real unit is never mutated.
///
/// [`TaskAction::predict`]: crate::action::TaskAction::predict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeculativeMinion {
    /// The real unit this projection was taken from.
    pub unit: EntityId,
    /// Projected position.
    pub pos: Position,
    /// Carry capacity.
    pub capacity: u32,
    /// Projected energy held.
    pub capacity_used: u32,
    /// Work parts (harvest throughput).
    pub work_parts: u32,
    /// Projected energy produced for the colony so far.
    pub output: u32,
}

impl SpeculativeMinion {
    /// Project a unit entity. Returns `None` for non-unit entities.
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        if !entity.kind.is_unit() {
            return None;
        }
        Some(Self {
            unit: entity.id,
            pos: entity.pos,
            capacity: entity.store.capacity,
            capacity_used: entity.store.used,
            work_parts: entity.work_parts(),
            output: 0,
        })
    }

    /// Project the unit `unit` as it currently stands in the world.
    pub fn of<V: WorldView + ?Sized>(view: &V, unit: EntityId) -> Option<Self> {
        view.entity(unit).and_then(Self::from_entity)
    }

    /// Projected free capacity.
    pub const fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.capacity_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::ZoneId;
    use colony_world::{EntityKind, Store};

    #[test]
    fn projects_units_only() {
        let pos = Position::new(ZoneId::new(0, 0), 3, 3);
        let unit = Entity::unit("worker", pos, 100, 3);
        let minion = SpeculativeMinion::from_entity(&unit);
        assert!(minion.as_ref().is_some_and(|m| m.free() == 100 && m.work_parts == 3));

        let spawn = Entity::new("spawn", EntityKind::Spawn, pos, Store::empty(300));
        assert!(SpeculativeMinion::from_entity(&spawn).is_none());
    }
}
