//! Cell taxonomy and reflection tables
//!
//! The grid is a closed set of cell kinds matched exhaustively by the tracer.
//! Mirror orientations form a 4-element cyclic group (45° apart); reflections
//! use the 2θ rotation form of the 2D reflection formula, which maps cardinal
//! directions back onto cardinal directions for every orientation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Cardinal beam/emitter direction. `North` is -y (row 0 is the top wall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit cell step for this direction
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    #[inline]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    /// Direction as a unit vector in grid-fractional space
    #[inline]
    pub fn as_vec(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }

    /// The two directions perpendicular to this one
    #[inline]
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::North | Direction::South => [Direction::East, Direction::West],
            Direction::East | Direction::West => [Direction::North, Direction::South],
        }
    }
}

/// Mirror orientation. Each player press advances to the next angle in the
/// cycle; four presses return to the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorAngle {
    /// 45° - backslash `\`
    Deg45,
    /// 90° - vertical `|`
    Deg90,
    /// 135° - forward slash `/`
    Deg135,
    /// 180° - horizontal `—`
    Deg180,
}

impl MirrorAngle {
    pub const ALL: [MirrorAngle; 4] = [
        MirrorAngle::Deg45,
        MirrorAngle::Deg90,
        MirrorAngle::Deg135,
        MirrorAngle::Deg180,
    ];

    /// Mirror plane angle in radians
    #[inline]
    pub fn theta(self) -> f32 {
        use std::f32::consts::PI;
        match self {
            MirrorAngle::Deg45 => PI / 4.0,
            MirrorAngle::Deg90 => PI / 2.0,
            MirrorAngle::Deg135 => 3.0 * PI / 4.0,
            MirrorAngle::Deg180 => PI,
        }
    }

    /// Next orientation in the rotation cycle (one 45° press)
    #[inline]
    pub fn next(self) -> MirrorAngle {
        match self {
            MirrorAngle::Deg45 => MirrorAngle::Deg90,
            MirrorAngle::Deg90 => MirrorAngle::Deg135,
            MirrorAngle::Deg135 => MirrorAngle::Deg180,
            MirrorAngle::Deg180 => MirrorAngle::Deg45,
        }
    }

    /// Outgoing cardinal direction for a beam entering this mirror
    #[inline]
    pub fn reflect(self, incoming: Direction) -> Direction {
        reflect_cardinal(self.theta(), incoming)
    }

    /// Orientation that turns `incoming` into `outgoing`, if one exists.
    /// Perpendicular turns are always served by one of the diagonals.
    pub fn turning(incoming: Direction, outgoing: Direction) -> Option<MirrorAngle> {
        MirrorAngle::ALL
            .into_iter()
            .find(|angle| angle.reflect(incoming) == outgoing)
    }
}

/// Beam splitter flavor. The reflect branch behaves like the matching
/// diagonal mirror; the straight-through branch is transparent glass.
/// Splitters never rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitterKind {
    /// Backslash-style, reflects like a 45° mirror
    Back,
    /// Forward-slash-style, reflects like a 135° mirror
    Forward,
}

impl SplitterKind {
    #[inline]
    pub fn theta(self) -> f32 {
        match self {
            SplitterKind::Back => MirrorAngle::Deg45.theta(),
            SplitterKind::Forward => MirrorAngle::Deg135.theta(),
        }
    }

    /// Outgoing direction of the reflected branch
    #[inline]
    pub fn reflect(self, incoming: Direction) -> Direction {
        reflect_cardinal(self.theta(), incoming)
    }

    /// Kind whose reflected branch turns `incoming` into `outgoing`
    pub fn turning(incoming: Direction, outgoing: Direction) -> Option<SplitterKind> {
        [SplitterKind::Back, SplitterKind::Forward]
            .into_iter()
            .find(|kind| kind.reflect(incoming) == outgoing)
    }
}

/// One grid cell. Target/switch charge and door link bookkeeping live on the
/// `Level` record, keeping this a plain closed taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Wall,
    Mirror(MirrorAngle),
    Splitter(SplitterKind),
    Emitter(Direction),
    Target,
    Switch,
    Door { open: bool },
}

impl Cell {
    /// Solid for player movement. Open doors are passable.
    #[inline]
    pub fn is_solid(self) -> bool {
        !matches!(self, Cell::Empty | Cell::Door { open: true })
    }
}

/// Reflect a cardinal direction off a mirror plane at angle `theta` using
/// 2θ: out = (dx·cos2θ + dy·sin2θ, dx·sin2θ − dy·cos2θ). For θ a multiple
/// of 45° the rounded result is always cardinal again.
fn reflect_cardinal(theta: f32, dir: Direction) -> Direction {
    let (dx, dy) = dir.delta();
    let a2 = 2.0 * theta;
    let c2 = a2.cos().round() as i32;
    let s2 = a2.sin().round() as i32;
    let out = (dx * c2 + dy * s2, dx * s2 - dy * c2);
    match Direction::from_delta(out.0, out.1) {
        Some(d) => d,
        None => unreachable!("2θ reflection of a cardinal at a 45° multiple is cardinal"),
    }
}

/// Reflect a free direction vector off a mirror plane at `theta`.
/// Continuous-mode counterpart of [`reflect_cardinal`], used while a mirror
/// is mid-rotation and at static optics reached by an angled beam.
#[inline]
pub fn reflect_vec(dir: Vec2, theta: f32) -> Vec2 {
    let (s2, c2) = (2.0 * theta).sin_cos();
    Vec2::new(dir.x * c2 + dir.y * s2, dir.x * s2 - dir.y * c2)
}
