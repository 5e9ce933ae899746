//! The movement primitive.
//!
//! [`Movement`] keeps one cached [`MoveRoute`] per unit. Each tick a unit
//! that still needs to travel follows one waypoint of its cached path.
//!
//! # Path computation
//!
//! Targets are the walkable tiles within the acceptance range of the target
//! position. For cross-zone travel a zone corridor is computed first with
//! [`find_zone_route`]; the tile search may only enter zones on that
//! corridor. The operation budget scales with the number of zones.
//!
//! # Stuck handling
//!
//! A unit whose position has not changed for more than `stuck_ticks`
//! consecutive ticks gets its path recomputed once, this time avoiding
//! tiles occupied by other units. After `max_recalculations` recomputations
//! the route reports [`ResultCode::ErrNoPath`]. Fatigue is not being stuck:
//! [`ResultCode::ErrTired`] clears the counter and is reported as `Ok`.
//!
//! # Edge stepping
//!
//! When a step fails with [`ResultCode::ErrNotFound`] while the unit stands
//! on a zone border, it is forced one tile away from the border and the
//! cached route is dropped so the next tick plans from the new zone.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use colony_types::{Direction, EntityId, Position, ResultCode, TaskActionResult, ZONE_SIZE, ZoneId};

use crate::pathfinding::{GridPathFinder, PathFinder, PathSearchOptions};
use crate::query::{World, WorldView};
use crate::zone_route::find_zone_route;

/// Tunables for the movement primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Consecutive ticks without moving before a path is recomputed.
    #[serde(default = "default_stuck_ticks")]
    pub stuck_ticks: u32,

    /// Recomputations allowed per route before reporting no path.
    #[serde(default = "default_max_recalculations")]
    pub max_recalculations: u32,

    /// Path cost of a plain tile.
    #[serde(default = "default_plain_cost")]
    pub plain_cost: u32,

    /// Path cost of a swamp tile.
    #[serde(default = "default_swamp_cost")]
    pub swamp_cost: u32,

    /// Search budget per zone on the corridor.
    #[serde(default = "default_max_ops_per_zone")]
    pub max_ops_per_zone: u32,

    /// Width of a zone, used to recognise border tiles.
    #[serde(default = "default_zone_size")]
    pub zone_size: u8,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            stuck_ticks: default_stuck_ticks(),
            max_recalculations: default_max_recalculations(),
            plain_cost: default_plain_cost(),
            swamp_cost: default_swamp_cost(),
            max_ops_per_zone: default_max_ops_per_zone(),
            zone_size: default_zone_size(),
        }
    }
}

const fn default_stuck_ticks() -> u32 {
    2
}

const fn default_max_recalculations() -> u32 {
    3
}

const fn default_plain_cost() -> u32 {
    2
}

const fn default_swamp_cost() -> u32 {
    10
}

const fn default_max_ops_per_zone() -> u32 {
    2000
}

const fn default_zone_size() -> u8 {
    ZONE_SIZE
}

/// A unit's cached travel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRoute {
    /// Where the unit is going.
    pub target: Position,
    /// Acceptance range around the target.
    pub range: u32,
    /// Remaining waypoints; `None` when no path could be found.
    pub path: Option<Vec<Position>>,
    /// Unit position observed on the previous tick.
    pub last_pos: Option<Position>,
    /// Consecutive ticks the unit has not moved.
    pub stuck_for_ticks: u32,
    /// Number of path recomputations so far.
    pub recalculated_path: u32,
}

impl MoveRoute {
    /// Plan a new route for a unit standing at `from`.
    pub fn plan<V: WorldView + ?Sized>(
        view: &V,
        pathfinder: &dyn PathFinder,
        config: &MovementConfig,
        from: Position,
        target: Position,
        range: u32,
    ) -> Self {
        Self {
            target,
            range,
            path: calculate_path(view, pathfinder, config, from, target, range, false),
            last_pos: Some(from),
            stuck_for_ticks: 0,
            recalculated_path: 0,
        }
    }

    /// Advance the unit one waypoint along the route.
    pub fn run<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        pathfinder: &dyn PathFinder,
        config: &MovementConfig,
        unit: EntityId,
    ) -> ResultCode {
        let Some(pos) = world.entity(unit).map(|e| e.pos) else {
            return ResultCode::ErrNotFound;
        };
        if self.recalculated_path >= config.max_recalculations || self.path.is_none() {
            return ResultCode::ErrNoPath;
        }

        if self.last_pos == Some(pos) {
            self.stuck_for_ticks = self.stuck_for_ticks.saturating_add(1);
        } else {
            self.stuck_for_ticks = 0;
        }
        self.last_pos = Some(pos);

        if self.stuck_for_ticks > config.stuck_ticks {
            debug!(unit = %unit, pos = %pos, attempt = self.recalculated_path, "unit stuck, recalculating path");
            self.path = calculate_path(&*world, pathfinder, config, pos, self.target, self.range, true);
            self.recalculated_path = self.recalculated_path.saturating_add(1);
            self.stuck_for_ticks = 0;
        }

        let Some(path) = self.path.as_mut() else {
            return ResultCode::ErrNoPath;
        };
        if let Some(index) = path.iter().position(|&p| p == pos) {
            path.drain(..=index);
        }
        if path.is_empty() {
            return ResultCode::Ok;
        }

        match world.move_by_path(unit, path) {
            ResultCode::ErrTired => {
                self.stuck_for_ticks = 0;
                ResultCode::Ok
            }
            code => code,
        }
    }
}

/// Compute a path from `from` to within `range` of `target`.
fn calculate_path<V: WorldView + ?Sized>(
    view: &V,
    pathfinder: &dyn PathFinder,
    config: &MovementConfig,
    from: Position,
    target: Position,
    range: u32,
    avoid_units: bool,
) -> Option<Vec<Position>> {
    let mut corridor: BTreeSet<ZoneId> = BTreeSet::new();
    corridor.insert(from.zone);
    if from.zone != target.zone {
        let route = find_zone_route(view, from.zone, target.zone)?;
        corridor.extend(route);
    }

    let radius = u8::try_from(range).unwrap_or(ZONE_SIZE).min(ZONE_SIZE);
    let targets: BTreeSet<Position> = target
        .positions_in_range(radius)
        .into_iter()
        .filter(|&p| corridor.contains(&p.zone) && view.is_walkable(p, false))
        .collect();
    if targets.is_empty() {
        return None;
    }

    let zone_count = u32::try_from(corridor.len()).unwrap_or(u32::MAX);
    let zone_costs = |zone: ZoneId| {
        if corridor.contains(&zone) {
            view.cost_matrix(zone, avoid_units)
        } else {
            None
        }
    };
    let terrain = |pos: Position| view.terrain(pos);
    let options = PathSearchOptions {
        zone_costs: &zone_costs,
        terrain: &terrain,
        plain_cost: config.plain_cost,
        swamp_cost: config.swamp_cost,
        max_ops: config.max_ops_per_zone.saturating_mul(zone_count),
    };

    let result = pathfinder.search(from, &targets, &options);
    debug!(
        from = %from,
        target = %target,
        cost = result.cost,
        ops = result.ops,
        incomplete = result.incomplete,
        avoid_units,
        "path computed"
    );
    if result.path.is_empty() && !targets.contains(&from) {
        return None;
    }
    Some(result.path)
}

/// Per-unit movement state plus the pathfinder used to plan routes.
pub struct Movement {
    config: MovementConfig,
    pathfinder: Box<dyn PathFinder>,
    routes: BTreeMap<EntityId, MoveRoute>,
}

impl core::fmt::Debug for Movement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Movement")
            .field("config", &self.config)
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

impl Movement {
    /// Create a movement primitive backed by the grid pathfinder.
    pub fn new(config: MovementConfig) -> Self {
        Self::with_pathfinder(config, Box::new(GridPathFinder::new()))
    }

    /// Create a movement primitive with a custom pathfinder.
    pub fn with_pathfinder(config: MovementConfig, pathfinder: Box<dyn PathFinder>) -> Self {
        Self {
            config,
            pathfinder,
            routes: BTreeMap::new(),
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Move `unit` one step toward being within `range` of `target`.
    ///
    /// Returns `Ok` when the unit is already in range, when it moved, or
    /// when it was too tired to move. Any other failure drops the cached
    /// route so that the next call plans afresh.
    pub fn travel<W: World + ?Sized>(&mut self, world: &mut W, unit: EntityId, target: Position, range: u32) -> ResultCode {
        let Some(pos) = world.entity(unit).map(|e| e.pos) else {
            self.routes.remove(&unit);
            return ResultCode::ErrNotFound;
        };
        if pos.in_range_to(target, range) {
            self.routes.remove(&unit);
            return ResultCode::Ok;
        }

        let needs_plan = self
            .routes
            .get(&unit)
            .is_none_or(|route| route.target != target || route.range != range);
        if needs_plan {
            let route = MoveRoute::plan(&*world, self.pathfinder.as_ref(), &self.config, pos, target, range);
            self.routes.insert(unit, route);
        }

        let code = match self.routes.get_mut(&unit) {
            Some(route) => route.run(world, self.pathfinder.as_ref(), &self.config, unit),
            None => ResultCode::ErrNoPath,
        };

        match code {
            ResultCode::Ok => ResultCode::Ok,
            ResultCode::ErrNotFound => {
                self.routes.remove(&unit);
                match self.border_exit(pos) {
                    Some(direction) => {
                        trace!(unit = %unit, pos = %pos, ?direction, "stepping off zone border");
                        let _ = world.move_direction(unit, direction);
                        ResultCode::Ok
                    }
                    None => ResultCode::ErrNotFound,
                }
            }
            other => {
                debug!(unit = %unit, target = %target, code = %other, "travel failed, dropping route");
                self.routes.remove(&unit);
                other
            }
        }
    }

    /// Behavior-tree flavour of [`Movement::travel`].
    pub fn move_to<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        unit: EntityId,
        target: Position,
        range: u32,
    ) -> TaskActionResult {
        let in_range = world
            .entity(unit)
            .is_some_and(|e| e.pos.in_range_to(target, range));
        if in_range {
            self.routes.remove(&unit);
            return TaskActionResult::Success;
        }
        match self.travel(world, unit, target, range) {
            ResultCode::Ok => TaskActionResult::InProgress,
            _ => TaskActionResult::Failed,
        }
    }

    /// Drop the cached route of a unit.
    pub fn forget(&mut self, unit: EntityId) {
        self.routes.remove(&unit);
    }

    /// The cached route of a unit, if any.
    pub fn route(&self, unit: EntityId) -> Option<&MoveRoute> {
        self.routes.get(&unit)
    }

    /// Drop routes of units that no longer exist.
    pub fn prune<V: WorldView + ?Sized>(&mut self, view: &V) {
        self.routes.retain(|&unit, _| view.entity(unit).is_some());
    }

    /// Direction that steps a unit off the zone border it stands on.
    fn border_exit(&self, pos: Position) -> Option<Direction> {
        let last = self.config.zone_size.saturating_sub(1);
        if pos.x == 0 {
            Some(Direction::Right)
        } else if pos.x == last {
            Some(Direction::Left)
        } else if pos.y == 0 {
            Some(Direction::Bottom)
        } else if pos.y == last {
            Some(Direction::Top)
        } else {
            None
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}
