//! World entities: units, energy containers, and structures.
//!
//! Every entity carries a [`Store`] of energy. Dropped piles have a store
//! whose capacity equals the amount lying on the floor; harvestable energy
//! sources hold their remaining regenerating energy.

use serde::{Deserialize, Serialize};

use colony_types::{EntityId, Position};

/// Terrain type of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground.
    #[default]
    Plain,
    /// Slow ground, expensive to path through.
    Swamp,
    /// Impassable.
    Wall,
}

/// The energy store of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Store {
    /// Energy currently held.
    pub used: u32,
    /// Maximum energy this store can hold.
    pub capacity: u32,
}

impl Store {
    /// Create a store holding `used` out of `capacity`.
    pub fn new(used: u32, capacity: u32) -> Self {
        Self {
            used: used.min(capacity),
            capacity,
        }
    }

    /// An empty store with the given capacity.
    pub const fn empty(capacity: u32) -> Self {
        Self { used: 0, capacity }
    }

    /// Remaining room in the store.
    pub const fn free(self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }
}

/// What an entity is, with per-kind data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile unit controlled by the colony.
    Unit {
        /// Number of work parts (harvesting throughput).
        work_parts: u32,
        /// Ticks of fatigue left before the unit may move again.
        fatigue: u32,
    },
    /// A harvestable energy node.
    EnergySource,
    /// Energy lying loose on the floor.
    DroppedEnergy,
    /// A small walkable storage structure.
    Container,
    /// The large central storage.
    Storage,
    /// An energy link.
    Link,
    /// A unit-producing structure.
    Spawn,
    /// A spawn energy extension.
    Extension,
    /// A defensive tower.
    Tower,
}

impl EntityKind {
    /// Whether this entity is a mobile unit.
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Unit { .. })
    }

    /// Whether this is a "real" logistics container: something energy can
    /// be withdrawn or picked up from.
    pub const fn is_logistics_container(self) -> bool {
        matches!(
            self,
            Self::DroppedEnergy | Self::Container | Self::Storage | Self::Link
        )
    }

    /// Whether units can stand on a tile occupied by this entity.
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Unit { .. } | Self::DroppedEnergy | Self::Container)
    }

    /// Whether energy can be transferred into this entity.
    pub const fn accepts_energy(self) -> bool {
        !matches!(self, Self::EnergySource | Self::DroppedEnergy)
    }
}

/// A single entity in the world snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: EntityId,
    /// Human-readable name (used in logs).
    pub name: String,
    /// Kind and per-kind data.
    pub kind: EntityKind,
    /// Current position.
    pub pos: Position,
    /// Energy store.
    pub store: Store,
}

impl Entity {
    /// Create an entity with a fresh identifier.
    pub fn new(name: impl Into<String>, kind: EntityKind, pos: Position, store: Store) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            kind,
            pos,
            store,
        }
    }

    /// Create a unit with the given carry capacity and work parts.
    pub fn unit(name: impl Into<String>, pos: Position, capacity: u32, work_parts: u32) -> Self {
        Self::new(
            name,
            EntityKind::Unit {
                work_parts,
                fatigue: 0,
            },
            pos,
            Store::empty(capacity),
        )
    }

    /// Number of work parts, zero for non-units.
    pub const fn work_parts(&self) -> u32 {
        match self.kind {
            EntityKind::Unit { work_parts, .. } => work_parts,
            _ => 0,
        }
    }
}
