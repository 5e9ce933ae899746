//! The demo scenario: a single-zone colony with a mining site, consumers,
//! carriers, and harvesters.
//!
//! Placement of carriers and of the dropped energy around the mining site
//! is drawn from a [`SmallRng`] seeded by `scenario.seed`, so a given
//! configuration always produces the same world.
//!
//! Between colony ticks the scenario plays the part of the rest of the
//! game: the spawn consumes its energy when full, the tower drains a
//! little every tick, and both file logistics requests while they have
//! room. Idle harvesters are sent back to the source, or to the container
//! when they are full.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use colony_core::{Colony, ColonyConfig, TickSummary};
use colony_logistics::LogisticsRequest;
use colony_tasks::{HarvestTask, TransferTask};
use colony_types::{EntityId, Position, ZoneId};
use colony_world::{Entity, EntityKind, SnapshotWorld, Store, Terrain, WorldView};

use crate::error::EngineError;

/// The only zone of the demo world.
const HOME: ZoneId = ZoneId::new(0, 0);

/// Ticks between spawn consumptions.
const SPAWN_INTERVAL: u64 = 40;

/// Energy the tower burns each tick.
const TOWER_DRAIN: u32 = 3;

/// A consumer files a request once it has at least this much room.
const REQUEST_THRESHOLD: u32 = 50;

/// Priority of spawn refills.
const SPAWN_PRIORITY: u32 = 1;

/// Priority of tower refills.
const TOWER_PRIORITY: u32 = 3;

/// Attempts at finding a free tile for a carrier.
const PLACEMENT_ATTEMPTS: u32 = 200;

/// A structure the scenario keeps track of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landmark {
    /// Entity id.
    pub id: EntityId,
    /// Where it stands.
    pub pos: Position,
}

/// The demo world and the colony that runs it.
#[derive(Debug)]
pub struct Scenario {
    /// The in-memory world.
    pub world: SnapshotWorld,
    /// The colony under test.
    pub colony: Colony,
    /// The energy source.
    pub source: Landmark,
    /// The container next to the source.
    pub container: Landmark,
    /// The spawn.
    pub spawn: Landmark,
    /// The tower.
    pub tower: Landmark,
    /// The storage.
    pub storage: Landmark,
    /// Carriers, in creation order.
    pub haulers: Vec<EntityId>,
    /// Harvesters, in creation order.
    pub workers: Vec<EntityId>,
}

impl Scenario {
    /// Build the demo world described by `config.scenario`.
    pub fn build(config: &ColonyConfig) -> Result<Self, EngineError> {
        let settings = &config.scenario;
        if settings.haulers > 0 && settings.hauler_capacity == 0 {
            return Err(EngineError::Scenario {
                message: "haulers need a non-zero hauler_capacity".to_owned(),
            });
        }

        let mut rng = SmallRng::seed_from_u64(settings.seed);
        let mut world = SnapshotWorld::new();
        world.add_zone(HOME)?;
        // A wall with a gap at either end, so carriers have to path around it.
        for y in 5..=40 {
            world.set_terrain(Position::new(HOME, 15, y), Terrain::Wall)?;
        }
        for x in 30..=34 {
            world.set_terrain(Position::new(HOME, x, 12), Terrain::Swamp)?;
        }

        let source = landmark(&mut world, "source", EntityKind::EnergySource, 25, 25, Store::new(3000, 3000))?;
        let container = landmark(&mut world, "container", EntityKind::Container, 26, 25, Store::new(500, 2000))?;
        let spawn = landmark(&mut world, "spawn", EntityKind::Spawn, 8, 10, Store::empty(300))?;
        let tower = landmark(&mut world, "tower", EntityKind::Tower, 40, 10, Store::new(200, 1000))?;
        let storage = landmark(&mut world, "storage", EntityKind::Storage, 40, 40, Store::empty(2000))?;

        scatter_piles(&mut world, &mut rng, source.pos, container.pos, settings.dropped_piles)?;

        let mut colony = Colony::new(config);
        let mut haulers = Vec::new();
        for _ in 0..settings.haulers {
            let pos = free_tile(&world, &mut rng)?;
            let unit = world.add_entity(Entity::unit("hauler", pos, settings.hauler_capacity, 0))?;
            let _ = colony.add_carrier(&world, unit)?;
            haulers.push(unit);
        }

        let mut workers = Vec::new();
        for _ in 0..settings.workers {
            let pos = free_tile(&world, &mut rng)?;
            let unit = world.add_entity(Entity::unit("harvester", pos, 50, 2))?;
            let _ = colony.add_worker(&world, unit)?;
            workers.push(unit);
        }

        info!(
            haulers = haulers.len(),
            workers = workers.len(),
            entities = world.entity_count(),
            "scenario world built"
        );

        Ok(Self {
            world,
            colony,
            source,
            container,
            spawn,
            tower,
            storage,
            haulers,
            workers,
        })
    }

    /// Run the rest of the game for one tick, then one colony tick, then
    /// advance the world clock.
    pub fn step(&mut self) -> Result<TickSummary, EngineError> {
        self.consume();
        self.file_requests()?;
        self.direct_workers();
        let summary = self.colony.run_tick(&mut self.world);
        self.world.advance_tick()?;
        Ok(summary)
    }

    /// Spawn and tower energy use.
    fn consume(&mut self) {
        let tick = self.world.tick();
        if let Some(tower) = self.world.entity_mut(self.tower.id) {
            tower.store.used = tower.store.used.saturating_sub(TOWER_DRAIN);
        }
        if tick == 0 || tick.checked_rem(SPAWN_INTERVAL) != Some(0) {
            return;
        }
        let full = self.world.entity_mut(self.spawn.id).filter(|s| s.store.free() == 0);
        if let Some(spawn) = full {
            spawn.store.used = 0;
            info!(tick, "spawn consumed its energy");
        }
    }

    /// File refill requests for consumers with room and no live request.
    fn file_requests(&mut self) -> Result<(), EngineError> {
        let tick = self.world.tick();
        for (key, target, priority) in [
            ("spawn", self.spawn, SPAWN_PRIORITY),
            ("tower", self.tower, TOWER_PRIORITY),
        ] {
            let room = self.world.free_capacity(target.id);
            let live = self.colony.logistics().book().request_for_key(key).is_some();
            if live || room < REQUEST_THRESHOLD {
                continue;
            }
            let id = self
                .colony
                .submit(key, LogisticsRequest::transfer(target.id, target.pos, room, priority, tick))?;
            debug!(key, request = %id, room, "refill requested");
        }
        Ok(())
    }

    /// Give every idle harvester its next goal.
    fn direct_workers(&mut self) {
        for unit in self.colony.idle_workers(&self.world) {
            let Some(store) = self.world.entity(unit).map(|e| e.store) else {
                continue;
            };
            let assigned = if store.free() == 0 {
                let goal = TransferTask::new(self.container.id, self.container.pos, store.used);
                self.colony.assign_goal_to(&self.world, unit, &goal)
            } else {
                let goal = HarvestTask::new(self.source.id, self.source.pos);
                self.colony.assign_goal_to(&self.world, unit, &goal)
            };
            if !matches!(assigned, Ok(true)) {
                debug!(unit = %unit, "no plan for harvester this tick");
            }
        }
    }
}

fn landmark(
    world: &mut SnapshotWorld,
    name: &str,
    kind: EntityKind,
    x: u8,
    y: u8,
    store: Store,
) -> Result<Landmark, EngineError> {
    let pos = Position::new(HOME, x, y);
    let id = world.add_entity(Entity::new(name, kind, pos, store))?;
    Ok(Landmark { id, pos })
}

/// Drop up to `count` energy piles on distinct free tiles around `source`.
fn scatter_piles(
    world: &mut SnapshotWorld,
    rng: &mut impl Rng,
    source: Position,
    container: Position,
    count: u32,
) -> Result<(), EngineError> {
    let mut tiles: Vec<Position> = colony_world::analyst::nearby_positions(&*world, source, 1)
        .into_iter()
        .filter(|&pos| pos != source && pos != container)
        .collect();
    tiles.shuffle(rng);
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    for pos in tiles.into_iter().take(count) {
        let amount: u32 = rng.random_range(25..=150);
        let _ = world.add_entity(Entity::new("dropped", EntityKind::DroppedEnergy, pos, Store::new(amount, amount)))?;
        debug!(pos = %pos, amount, "energy dropped");
    }
    Ok(())
}

/// A random walkable tile with nothing on it.
fn free_tile(world: &SnapshotWorld, rng: &mut impl Rng) -> Result<Position, EngineError> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let pos = Position::new(HOME, rng.random_range(2..48), rng.random_range(2..48));
        let empty = world.entities_near(pos, 0).is_empty();
        if empty && world.terrain(pos) == Terrain::Plain {
            return Ok(pos);
        }
    }
    Err(EngineError::Scenario {
        message: format!("no free tile found after {PLACEMENT_ATTEMPTS} attempts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(scenario: &Scenario, units: &[EntityId]) -> Vec<Position> {
        units
            .iter()
            .filter_map(|&id| scenario.world.entity(id).map(|e| e.pos))
            .collect()
    }

    #[test]
    fn default_scenario_builds() {
        let config = ColonyConfig::default();
        let scenario = Scenario::build(&config);
        assert!(scenario.is_ok());
        let Ok(scenario) = scenario else {
            return;
        };
        assert_eq!(scenario.haulers.len(), 3);
        assert_eq!(scenario.workers.len(), 2);
        assert_eq!(scenario.colony.logistics().carriers().len(), 3);
        let piles = scenario
            .world
            .entities_near(scenario.source.pos, 1)
            .into_iter()
            .filter(|e| e.kind == EntityKind::DroppedEnergy)
            .count();
        assert_eq!(piles, 4);
    }

    #[test]
    fn same_seed_same_world() {
        let config = ColonyConfig::default();
        let (Ok(a), Ok(b)) = (Scenario::build(&config), Scenario::build(&config)) else {
            return;
        };
        assert_eq!(positions(&a, &a.haulers), positions(&b, &b.haulers));
        assert_eq!(positions(&a, &a.workers), positions(&b, &b.workers));
    }

    #[test]
    fn zero_capacity_haulers_rejected() {
        let mut config = ColonyConfig::default();
        config.scenario.hauler_capacity = 0;
        assert!(matches!(
            Scenario::build(&config),
            Err(EngineError::Scenario { .. })
        ));
    }

    #[test]
    fn scenario_runs_balanced_and_feeds_consumers() {
        let config = ColonyConfig::default();
        let Ok(mut scenario) = Scenario::build(&config) else {
            return;
        };
        let mut completed = 0_u32;
        for _ in 0..150 {
            let Ok(summary) = scenario.step() else {
                return;
            };
            assert!(summary.is_balanced(), "audit failed at tick {}", summary.tick);
            completed = completed.saturating_add(summary.logistics.completed);
        }
        assert!(completed > 0);
        assert!(scenario.world.used_capacity(scenario.spawn.id) > 0);
    }
}
