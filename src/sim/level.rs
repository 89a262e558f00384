//! Level data model
//!
//! A `Level` owns the grid plus the emitter/target/switch/door records and
//! the player start pose. It is built once by the generator and mutated in
//! place only by mirror rotation finalization, door opening and charge
//! updates; level advance replaces it wholesale.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, Direction, MirrorAngle};
use super::trace::TraceResult;

/// Grid cell coordinate (column, row)
pub type GridPos = (i32, i32);

/// 2D array of cells. The outer ring is always `Wall`; reads outside the
/// bounds also answer `Wall` so beam and collision code never special-cases
/// the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cols: i32,
    rows: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-empty grid; call `stamp_border` before use
    pub fn new(cols: i32, rows: i32) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::Empty; (cols * rows) as usize],
        }
    }

    #[inline]
    pub fn cols(&self) -> i32 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.cols && y >= 0 && y < self.rows
    }

    #[inline]
    pub fn is_border(&self, x: i32, y: i32) -> bool {
        x == 0 || y == 0 || x == self.cols - 1 || y == self.rows - 1
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Cell {
        if self.in_bounds(x, y) {
            self.cells[(y * self.cols + x) as usize]
        } else {
            Cell::Wall
        }
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if self.in_bounds(x, y) {
            self.cells[(y * self.cols + x) as usize] = cell;
        }
    }

    /// Stamp the outer ring as wall
    pub fn stamp_border(&mut self) {
        for x in 0..self.cols {
            self.set(x, 0, Cell::Wall);
            self.set(x, self.rows - 1, Cell::Wall);
        }
        for y in 0..self.rows {
            self.set(0, y, Cell::Wall);
            self.set(self.cols - 1, y, Cell::Wall);
        }
    }

    /// Iterate cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, Cell)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &c)| ((i as i32 % cols, i as i32 / cols), c))
    }
}

/// Wall-mounted laser source with a fixed firing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emitter {
    pub pos: GridPos,
    pub dir: Direction,
}

/// Charge accumulator backing a target or switch cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChargeNode {
    pub pos: GridPos,
    /// Illumination progress in [0, 1]; 1.0 locks the node
    pub charge: f32,
}

impl ChargeNode {
    pub fn new(pos: GridPos) -> Self {
        Self { pos, charge: 0.0 }
    }

    /// Locked nodes never change charge again
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.charge >= 1.0
    }
}

/// Link from one or more switches to a door cell. `open` is monotone: once
/// true it never reverts within a level instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorLink {
    pub door: GridPos,
    pub switches: Vec<GridPos>,
    pub open: bool,
}

/// Player spawn pose in grid-fractional coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerStart {
    pub pos: Vec2,
    /// Facing angle in radians
    pub angle: f32,
}

/// A solution mirror's pre-scramble orientation, kept for verification and
/// hint overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionMirror {
    pub pos: GridPos,
    pub angle: MirrorAngle,
}

/// One playable puzzle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub grid: Grid,
    pub emitters: Vec<Emitter>,
    pub targets: Vec<ChargeNode>,
    pub switches: Vec<ChargeNode>,
    pub doors: Vec<DoorLink>,
    pub start: PlayerStart,
    /// Seconds under which a time bonus is awarded
    pub par_time: f32,
    /// Pre-scramble orientations of the solution mirrors
    pub solution: Vec<SolutionMirror>,
}

impl Level {
    pub fn target_at_mut(&mut self, pos: GridPos) -> Option<&mut ChargeNode> {
        self.targets.iter_mut().find(|t| t.pos == pos)
    }

    pub fn switch_at(&self, pos: GridPos) -> Option<&ChargeNode> {
        self.switches.iter().find(|s| s.pos == pos)
    }

    /// True once every target is locked. Switches gate doors, not the win.
    pub fn all_targets_locked(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(ChargeNode::is_locked)
    }

    /// Whether a trace hits every target, and every switch when any exist.
    /// Used both for solution verification and pre-solved rejection.
    pub fn beam_satisfies(&self, result: &TraceResult) -> bool {
        let targets_ok = self
            .targets
            .iter()
            .all(|t| result.targets_hit.contains(&t.pos));
        let switches_ok = self
            .switches
            .iter()
            .all(|s| result.switches_hit.contains(&s.pos));
        targets_ok && switches_ok
    }

    /// Open the door at `doors[idx]`, making the cell permanently passable
    pub fn open_door(&mut self, idx: usize) {
        if let Some(link) = self.doors.get_mut(idx) {
            link.open = true;
            let (x, y) = link.door;
            self.grid.set(x, y, Cell::Door { open: true });
        }
    }
}
