//! Zones, positions, ranges, and movement directions.
//!
//! The world is a grid of square zones, each with a local coordinate grid of
//! [`ZONE_SIZE`] x [`ZONE_SIZE`] tiles. Zones are addressed by integer
//! coordinates so that every position also has a *global* coordinate, which
//! makes ranges across zone borders well defined:
//!
//! ```text
//! global_x = zone.x * ZONE_SIZE + x
//! ```
//!
//! Range is the Chebyshev distance (diagonal moves cost one step), which is
//! also the interaction range metric used by withdraw/transfer commands.

use serde::{Deserialize, Serialize};

/// Width and height of a zone's local grid, in tiles.
pub const ZONE_SIZE: u8 = 50;

/// Index of the last tile on each zone axis.
const ZONE_EDGE: u8 = ZONE_SIZE.saturating_sub(1);

/// Integer coordinates of a zone (room) on the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    /// Horizontal zone coordinate (grows to the right).
    pub x: i32,
    /// Vertical zone coordinate (grows downwards).
    pub y: i32,
}

impl ZoneId {
    /// Create a zone identifier from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four zones sharing a border with this one.
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y.saturating_sub(1)),
            Self::new(self.x.saturating_add(1), self.y),
            Self::new(self.x, self.y.saturating_add(1)),
            Self::new(self.x.saturating_sub(1), self.y),
        ]
    }
}

impl core::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Z{}:{}", self.x, self.y)
    }
}

/// The eight movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards decreasing `y`.
    Top,
    /// Up and to the right.
    TopRight,
    /// Towards increasing `x`.
    Right,
    /// Down and to the right.
    BottomRight,
    /// Towards increasing `y`.
    Bottom,
    /// Down and to the left.
    BottomLeft,
    /// Towards decreasing `x`.
    Left,
    /// Up and to the left.
    TopLeft,
}

impl Direction {
    /// All directions, clockwise from [`Direction::Top`].
    pub const ALL: [Self; 8] = [
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
        Self::TopLeft,
    ];

    /// The `(dx, dy)` step for this direction.
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (1, 1),
            Self::Bottom => (0, 1),
            Self::BottomLeft => (-1, 1),
            Self::Left => (-1, 0),
            Self::TopLeft => (-1, -1),
        }
    }
}

/// A tile on the world map: zone plus local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// The zone containing this tile.
    pub zone: ZoneId,
    /// Local x coordinate, `0..ZONE_SIZE`.
    pub x: u8,
    /// Local y coordinate, `0..ZONE_SIZE`.
    pub y: u8,
}

impl Position {
    /// Create a position. Local coordinates beyond the zone edge are
    /// clamped to the edge.
    pub fn new(zone: ZoneId, x: u8, y: u8) -> Self {
        Self {
            zone,
            x: x.min(ZONE_EDGE),
            y: y.min(ZONE_EDGE),
        }
    }

    /// Global `(x, y)` coordinates of this tile.
    pub fn global(self) -> (i64, i64) {
        let size = i64::from(ZONE_SIZE);
        (
            i64::from(self.zone.x)
                .saturating_mul(size)
                .saturating_add(i64::from(self.x)),
            i64::from(self.zone.y)
                .saturating_mul(size)
                .saturating_add(i64::from(self.y)),
        )
    }

    /// Build a position from global coordinates.
    pub fn from_global(gx: i64, gy: i64) -> Self {
        let size = i64::from(ZONE_SIZE);
        let zone = ZoneId::new(
            i32::try_from(gx.div_euclid(size)).unwrap_or_default(),
            i32::try_from(gy.div_euclid(size)).unwrap_or_default(),
        );
        Self {
            zone,
            x: u8::try_from(gx.rem_euclid(size)).unwrap_or_default(),
            y: u8::try_from(gy.rem_euclid(size)).unwrap_or_default(),
        }
    }

    /// Chebyshev range to another position, across zone borders.
    pub fn range_to(self, other: Self) -> u32 {
        let (ax, ay) = self.global();
        let (bx, by) = other.global();
        let dx = ax.abs_diff(bx);
        let dy = ay.abs_diff(by);
        u32::try_from(dx.max(dy)).unwrap_or(u32::MAX)
    }

    /// Whether `other` is within `range` tiles of this position.
    pub fn in_range_to(self, other: Self, range: u32) -> bool {
        self.range_to(other) <= range
    }

    /// Whether this tile lies on the outer border of its zone.
    pub const fn is_edge(self) -> bool {
        self.x == 0 || self.y == 0 || self.x == ZONE_EDGE || self.y == ZONE_EDGE
    }

    /// The tile one step away in `direction`, possibly in the next zone.
    pub fn step(self, direction: Direction) -> Self {
        let (gx, gy) = self.global();
        let (dx, dy) = direction.delta();
        Self::from_global(gx.saturating_add(dx), gy.saturating_add(dy))
    }

    /// The direction of an adjacent tile, or `None` if `other` is not
    /// exactly one step away.
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&direction| self.step(direction) == other)
    }

    /// All tiles within `range` of this one (including itself), in
    /// row-major global order.
    pub fn positions_in_range(self, range: u8) -> Vec<Self> {
        let (cx, cy) = self.global();
        let r = i64::from(range);
        let mut out = Vec::new();
        for gy in cy.saturating_sub(r)..=cy.saturating_add(r) {
            for gx in cx.saturating_sub(r)..=cx.saturating_add(r) {
                out.push(Self::from_global(gx, gy));
            }
        }
        out
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{} {},{}]", self.zone, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: ZoneId = ZoneId::new(0, 0);

    #[test]
    fn range_is_chebyshev() {
        let a = Position::new(HOME, 10, 10);
        let b = Position::new(HOME, 13, 15);
        assert_eq!(a.range_to(b), 5);
        assert!(a.in_range_to(b, 5));
        assert!(!a.in_range_to(b, 4));
    }

    #[test]
    fn range_crosses_zone_borders() {
        let a = Position::new(HOME, 49, 25);
        let b = Position::new(ZoneId::new(1, 0), 0, 25);
        assert_eq!(a.range_to(b), 1);
    }

    #[test]
    fn step_wraps_into_neighbor_zone() {
        let edge = Position::new(HOME, 49, 10);
        let next = edge.step(Direction::Right);
        assert_eq!(next, Position::new(ZoneId::new(1, 0), 0, 10));
        assert_eq!(edge.direction_to(next), Some(Direction::Right));
    }

    #[test]
    fn negative_zones_round_trip_through_global() {
        let p = Position::new(ZoneId::new(-2, -1), 3, 47);
        let (gx, gy) = p.global();
        assert_eq!(Position::from_global(gx, gy), p);
    }

    #[test]
    fn edge_detection() {
        assert!(Position::new(HOME, 0, 20).is_edge());
        assert!(Position::new(HOME, 20, 49).is_edge());
        assert!(!Position::new(HOME, 1, 48).is_edge());
    }

    #[test]
    fn positions_in_range_counts_square() {
        let center = Position::new(HOME, 10, 10);
        assert_eq!(center.positions_in_range(1).len(), 9);
        assert_eq!(center.positions_in_range(0), vec![center]);
    }
}
