//! Full colony ticks against the in-memory world.
//!
//! These drive [`Colony::run_tick`] over many ticks the way the engine
//! binary does and check the end state of the world together with the
//! per-tick reservation audit.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::too_many_lines
)]

use colony_core::{Colony, ColonyConfig, TickSummary};
use colony_logistics::LogisticsRequest;
use colony_types::{EntityId, Position, ZoneId};
use colony_world::{Entity, EntityKind, SnapshotWorld, Store, WorldView};

const HOME: ZoneId = ZoneId::new(0, 0);
const NEXT: ZoneId = ZoneId::new(1, 0);

struct Fixture {
    world: SnapshotWorld,
    colony: Colony,
    container: EntityId,
    haulers: Vec<EntityId>,
}

fn fixture(config: &ColonyConfig, haulers: u8, hauler_capacity: u32) -> Fixture {
    let mut world = SnapshotWorld::new();
    world.add_zone(HOME).unwrap();
    world
        .add_entity(Entity::new(
            "source",
            EntityKind::EnergySource,
            Position::new(HOME, 25, 25),
            Store::new(3000, 3000),
        ))
        .unwrap();
    let container = world
        .add_entity(Entity::new(
            "container",
            EntityKind::Container,
            Position::new(HOME, 26, 25),
            Store::new(600, 2000),
        ))
        .unwrap();

    let mut colony = Colony::new(config);
    let mut units = Vec::new();
    for i in 0..haulers {
        let unit = world
            .add_entity(Entity::unit(
                "hauler",
                Position::new(HOME, 20_u8.saturating_add(i.saturating_mul(2)), 20),
                hauler_capacity,
                0,
            ))
            .unwrap();
        colony.add_carrier(&world, unit).unwrap();
        units.push(unit);
    }

    Fixture {
        world,
        colony,
        container,
        haulers: units,
    }
}

impl Fixture {
    fn tick(&mut self) -> TickSummary {
        let summary = self.colony.run_tick(&mut self.world);
        assert!(summary.is_balanced(), "audit failed: {:?}", summary.anomaly);
        self.world.advance_tick().unwrap();
        summary
    }

    fn add(&mut self, name: &str, kind: EntityKind, x: u8, y: u8, capacity: u32) -> EntityId {
        self.world
            .add_entity(Entity::new(name, kind, Position::new(HOME, x, y), Store::empty(capacity)))
            .unwrap()
    }
}

#[test]
fn storage_fills_from_primary_sources_only() {
    let mut f = fixture(&ColonyConfig::default(), 2, 50);
    let storage = f.add("storage", EntityKind::Storage, 40, 40, 200);

    let mut ticks = 0_u32;
    while f.world.used_capacity(storage) < 200 && ticks < 400 {
        f.tick();
        ticks = ticks.saturating_add(1);
    }
    for _ in 0..5 {
        f.tick();
    }

    assert_eq!(f.world.used_capacity(storage), 200);
    assert_eq!(f.world.used_capacity(f.container), 400);
    assert_eq!(f.colony.logistics().book().sources().count(), 2);
    assert!(f.colony.logistics().book().sources().all(|s| s.reserved_capacity == 0));
    assert!(f.colony.logistics().routes().is_empty());
}

#[test]
fn chaining_follows_config() {
    let chained = ColonyConfig::default();
    let single = ColonyConfig::parse("logistics:\n  chain_requests: false\n").unwrap();

    for (config, expected, queued) in [(chained, 1, 2), (single, 0, 1)] {
        let mut f = fixture(&config, 1, 100);
        let spawn = f.add("spawn", EntityKind::Spawn, 30, 30, 300);
        let tower = f.add("tower", EntityKind::Tower, 20, 30, 1000);
        f.colony
            .submit("spawn", LogisticsRequest::transfer(spawn, Position::new(HOME, 30, 30), 20, 1, 0))
            .unwrap();
        f.colony
            .submit("tower", LogisticsRequest::transfer(tower, Position::new(HOME, 20, 30), 20, 2, 0))
            .unwrap();

        let summary = f.tick();
        assert_eq!(summary.plan.matched, 1);
        assert_eq!(summary.plan.chained, expected);
        let route = f.colony.logistics().route(f.haulers[0]).unwrap();
        assert_eq!(route.requests.len(), queued);
    }
}

#[test]
fn hostile_zones_contribute_no_sources() {
    let mut f = fixture(&ColonyConfig::default(), 1, 50);
    f.world.add_zone(NEXT).unwrap();
    f.world.set_zone_hostile(NEXT, true).unwrap();
    f.world
        .add_entity(Entity::new(
            "foreign source",
            EntityKind::EnergySource,
            Position::new(NEXT, 10, 10),
            Store::new(3000, 3000),
        ))
        .unwrap();

    let summary = f.tick();
    assert_eq!(summary.sources, 1);
    assert!(f.colony.logistics().book().source(Position::new(NEXT, 10, 10)).is_none());
}

#[test]
fn vanished_target_retires_route() {
    let mut f = fixture(&ColonyConfig::default(), 1, 50);
    let tower = f.add("tower", EntityKind::Tower, 20, 30, 1000);
    f.colony
        .submit("tower", LogisticsRequest::transfer(tower, Position::new(HOME, 20, 30), 50, 1, 0))
        .unwrap();
    f.tick();
    assert!(f.colony.logistics().route(f.haulers[0]).is_some());

    f.world.remove_entity(tower).unwrap();
    let mut retired = false;
    for _ in 0..40 {
        let summary = f.tick();
        if summary.logistics.completed > 0 {
            retired = true;
            break;
        }
    }
    assert!(retired);
    assert!(f.colony.logistics().routes().is_empty());
    assert!(f.colony.logistics().book().sources().all(|s| s.reserved_capacity == 0));
}

#[test]
fn summary_counts_pending_requests() {
    let mut f = fixture(&ColonyConfig::default(), 0, 50);
    let spawn = f.add("spawn", EntityKind::Spawn, 30, 30, 300);
    f.colony
        .submit("spawn", LogisticsRequest::transfer(spawn, Position::new(HOME, 30, 30), 100, 1, 0))
        .unwrap();
    let summary = f.tick();
    assert_eq!(summary.plan.matched, 0);
    assert_eq!(summary.pending_requests, 1);
    assert_eq!(summary.tick, 0);
}
