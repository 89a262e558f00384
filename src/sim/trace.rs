//! Beam tracing engine
//!
//! Two modes share one cell-stepping walker:
//!
//! - **Discrete**: `trace` steps whole cells and resolves mirrors through the
//!   cardinal reflection table. Splitter forks go onto an explicit work-list
//!   with a branch depth cap, so memory stays bounded and no native stack
//!   depth is consumed.
//! - **Continuous**: `trace_animated` walks discretely until it reaches a
//!   mirror that is mid-rotation, then switches to sub-cell stepping with the
//!   interpolated reflection angle so the beam sweeps smoothly instead of
//!   snapping. Static optics reached by an angled beam keep reflecting with
//!   the continuous 2θ formula.
//!
//! Neither mode mutates the grid or keeps scratch state between calls, and
//! both terminate on any grid: every branch is bounded by step and depth
//! caps, which simply truncate a pathological beam as if absorbed.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cell_center;
use crate::consts::{
    MAX_BEAM_STEPS, MAX_BRANCH_DEPTH, MAX_CONTINUOUS_DEPTH, MAX_SUB_STEPS, SUB_STEP,
};

use super::cell::{Cell, Direction, reflect_vec};
use super::level::{Emitter, Grid, GridPos};

/// Drawable beam segment, endpoints in grid-fractional coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamSegment {
    pub start: Vec2,
    pub end: Vec2,
}

/// Everything one full retrace produces. Recomputed synchronously whenever
/// the grid or an animating mirror's angle changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceResult {
    /// Cells the beam passes through or terminates in (floor/wall glow)
    pub lit_cells: HashSet<GridPos>,
    /// Segments in trace order, for the renderer
    pub segments: Vec<BeamSegment>,
    pub targets_hit: HashSet<GridPos>,
    pub switches_hit: HashSet<GridPos>,
}

/// In-flight rotation record for a single mirror cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MirrorAnim {
    pub from_theta: f32,
    /// Always `from_theta` + 45°
    pub to_theta: f32,
    /// Elapsed/duration ratio
    pub progress: f32,
}

impl MirrorAnim {
    /// Linearly interpolated mirror angle for the current progress
    #[inline]
    pub fn interpolated_theta(&self) -> f32 {
        let t = self.progress.min(1.0);
        self.from_theta + t * (self.to_theta - self.from_theta)
    }
}

/// Animating mirrors keyed by cell. At most one entry exists at a time, but
/// the tracer does not rely on that.
pub type AnimMap = HashMap<GridPos, MirrorAnim>;

/// Discrete trace from every emitter
pub fn trace(grid: &Grid, emitters: &[Emitter]) -> TraceResult {
    trace_with_anims(grid, emitters, None)
}

/// Continuous-capable trace used while a mirror rotation is animating
pub fn trace_animated(grid: &Grid, emitters: &[Emitter], anims: &AnimMap) -> TraceResult {
    trace_with_anims(grid, emitters, Some(anims))
}

/// A pending branch: either whole-cell stepping or sub-cell stepping after
/// an interpolated reflection
enum Branch {
    Cardinal(GridPos, Direction, u32),
    Continuous(Vec2, Vec2, u32),
}

fn trace_with_anims(grid: &Grid, emitters: &[Emitter], anims: Option<&AnimMap>) -> TraceResult {
    let mut result = TraceResult::default();
    let mut work: Vec<Branch> = emitters
        .iter()
        .map(|e| Branch::Cardinal(e.pos, e.dir, 0))
        .collect();
    // Emitters were pushed in order; pop from the back but reverse so the
    // first emitter's segments come first.
    work.reverse();

    while let Some(branch) = work.pop() {
        match branch {
            Branch::Cardinal(pos, dir, depth) => {
                walk_cells(grid, pos, dir, depth, anims, &mut work, &mut result);
            }
            Branch::Continuous(origin, dir, depth) => {
                walk_substeps(grid, origin, dir, depth, &mut work, &mut result);
            }
        }
    }
    result
}

/// Whole-cell walk from `start` heading `dir`. Pushes splitter forks and
/// continuous hand-offs onto the work-list instead of recursing.
fn walk_cells(
    grid: &Grid,
    start: GridPos,
    mut dir: Direction,
    depth: u32,
    anims: Option<&AnimMap>,
    work: &mut Vec<Branch>,
    result: &mut TraceResult,
) {
    if depth > MAX_BRANCH_DEPTH {
        return;
    }
    let (mut cx, mut cy) = start;
    for _ in 0..MAX_BEAM_STEPS {
        let (dx, dy) = dir.delta();
        let (nx, ny) = (cx + dx, cy + dy);
        let segment = BeamSegment {
            start: cell_center(cx, cy),
            end: cell_center(nx, ny),
        };
        match grid.get(nx, ny) {
            Cell::Wall | Cell::Emitter(_) | Cell::Door { open: false } => {
                result.segments.push(segment);
                return;
            }
            Cell::Target => {
                result.segments.push(segment);
                result.lit_cells.insert((nx, ny));
                result.targets_hit.insert((nx, ny));
                return;
            }
            Cell::Switch => {
                result.segments.push(segment);
                result.lit_cells.insert((nx, ny));
                result.switches_hit.insert((nx, ny));
                return;
            }
            Cell::Mirror(angle) => {
                result.segments.push(segment);
                result.lit_cells.insert((nx, ny));
                if let Some(anim) = anims.and_then(|m| m.get(&(nx, ny))) {
                    // Hand off to sub-cell stepping with the interpolated angle
                    let out = reflect_vec(dir.as_vec(), anim.interpolated_theta());
                    work.push(Branch::Continuous(cell_center(nx, ny), out, depth));
                    return;
                }
                dir = angle.reflect(dir);
                (cx, cy) = (nx, ny);
            }
            Cell::Splitter(kind) => {
                result.segments.push(segment);
                result.lit_cells.insert((nx, ny));
                work.push(Branch::Cardinal((nx, ny), kind.reflect(dir), depth + 1));
                // Straight-through branch continues as glass
                (cx, cy) = (nx, ny);
            }
            Cell::Empty | Cell::Door { open: true } => {
                result.segments.push(segment);
                result.lit_cells.insert((nx, ny));
                (cx, cy) = (nx, ny);
            }
        }
    }
}

/// Sub-cell walk for a beam at an arbitrary angle. Cell membership is
/// re-checked every step; each newly entered cell is classified once.
fn walk_substeps(
    grid: &Grid,
    origin: Vec2,
    dir: Vec2,
    depth: u32,
    work: &mut Vec<Branch>,
    result: &mut TraceResult,
) {
    if depth > MAX_CONTINUOUS_DEPTH {
        return;
    }
    let start_cell = (origin.x.floor() as i32, origin.y.floor() as i32);
    let mut pos = origin;
    let mut entered: HashSet<GridPos> = HashSet::new();
    for _ in 0..MAX_SUB_STEPS {
        pos += dir * SUB_STEP;
        let cell_pos = (pos.x.floor() as i32, pos.y.floor() as i32);
        if !grid.in_bounds(cell_pos.0, cell_pos.1) {
            result.segments.push(BeamSegment { start: origin, end: pos });
            return;
        }
        if cell_pos == start_cell || !entered.insert(cell_pos) {
            continue;
        }
        let center = cell_center(cell_pos.0, cell_pos.1);
        match grid.get(cell_pos.0, cell_pos.1) {
            Cell::Wall | Cell::Emitter(_) | Cell::Door { open: false } => {
                result.segments.push(BeamSegment { start: origin, end: center });
                return;
            }
            Cell::Target => {
                result.segments.push(BeamSegment { start: origin, end: center });
                result.lit_cells.insert(cell_pos);
                result.targets_hit.insert(cell_pos);
                return;
            }
            Cell::Switch => {
                result.segments.push(BeamSegment { start: origin, end: center });
                result.lit_cells.insert(cell_pos);
                result.switches_hit.insert(cell_pos);
                return;
            }
            Cell::Mirror(angle) => {
                result.segments.push(BeamSegment { start: origin, end: center });
                result.lit_cells.insert(cell_pos);
                let out = reflect_vec(dir, angle.theta());
                work.push(Branch::Continuous(center, out, depth + 1));
                return;
            }
            Cell::Splitter(kind) => {
                result.segments.push(BeamSegment { start: origin, end: center });
                result.lit_cells.insert(cell_pos);
                let out = reflect_vec(dir, kind.theta());
                work.push(Branch::Continuous(center, out, depth + 1));
                // Straight-through branch keeps sub-stepping from here
                work.push(Branch::Continuous(center, dir, depth + 1));
                return;
            }
            Cell::Empty | Cell::Door { open: true } => {
                result.lit_cells.insert(cell_pos);
            }
        }
    }
    // Step cap hit: truncate the beam where it stands
    result.segments.push(BeamSegment { start: origin, end: pos });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::cell::{MirrorAngle, SplitterKind};

    fn empty_room(cols: i32, rows: i32) -> Grid {
        let mut grid = Grid::new(cols, rows);
        grid.stamp_border();
        grid
    }

    fn emitter(grid: &mut Grid, x: i32, y: i32, dir: Direction) -> Emitter {
        grid.set(x, y, Cell::Emitter(dir));
        Emitter { pos: (x, y), dir }
    }

    #[test]
    fn straight_beam_stops_at_wall() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 0, 3, Direction::East);
        let result = trace(&grid, &[em]);
        assert!(result.targets_hit.is_empty());
        // Lit every interior cell of the row
        for x in 1..7 {
            assert!(result.lit_cells.contains(&(x, 3)));
        }
        // Last segment ends at the far wall column
        let last = result.segments.last().expect("beam must emit segments");
        assert_eq!(last.end, crate::cell_center(7, 3));
    }

    #[test]
    fn mirror_redirects_beam_into_target() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 4, 7, Direction::North);
        grid.set(4, 4, Cell::Mirror(MirrorAngle::Deg45));
        grid.set(1, 4, Cell::Target);
        let result = trace(&grid, &[em]);
        assert!(result.targets_hit.contains(&(1, 4)));
        assert!(result.lit_cells.contains(&(4, 4)));
    }

    #[test]
    fn splitter_feeds_both_branches() {
        let mut grid = empty_room(10, 10);
        let em = emitter(&mut grid, 0, 4, Direction::East);
        // Reflect branch goes south, straight branch continues east
        grid.set(5, 4, Cell::Splitter(SplitterKind::Back));
        grid.set(5, 8, Cell::Target);
        grid.set(8, 4, Cell::Target);
        let result = trace(&grid, &[em]);
        assert!(result.targets_hit.contains(&(5, 8)));
        assert!(result.targets_hit.contains(&(8, 4)));
    }

    #[test]
    fn closed_door_blocks_open_door_passes() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 0, 3, Direction::East);
        grid.set(4, 3, Cell::Door { open: false });
        grid.set(6, 3, Cell::Target);

        let blocked = trace(&grid, &[em]);
        assert!(blocked.targets_hit.is_empty());
        assert!(!blocked.lit_cells.contains(&(5, 3)));

        grid.set(4, 3, Cell::Door { open: true });
        let open = trace(&grid, &[em]);
        assert!(open.targets_hit.contains(&(6, 3)));
    }

    #[test]
    fn switch_hits_are_reported_separately() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 0, 3, Direction::East);
        grid.set(5, 3, Cell::Switch);
        let result = trace(&grid, &[em]);
        assert!(result.switches_hit.contains(&(5, 3)));
        assert!(result.targets_hit.is_empty());
    }

    #[test]
    fn mirror_loop_terminates() {
        // Four mirrors forming a closed light box, no absorber reachable
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 0, 2, Direction::East);
        grid.set(5, 2, Cell::Mirror(MirrorAngle::Deg45)); // east -> south
        grid.set(5, 5, Cell::Mirror(MirrorAngle::Deg135)); // south -> west
        grid.set(2, 5, Cell::Mirror(MirrorAngle::Deg45)); // west -> north
        grid.set(2, 2, Cell::Mirror(MirrorAngle::Deg135)); // north -> east
        let result = trace(&grid, &[em]);
        // Truncated by the step cap, not hung
        assert!(result.segments.len() <= MAX_BEAM_STEPS + 1);
        assert!(result.targets_hit.is_empty());
    }

    #[test]
    fn facing_splitters_terminate_at_depth_cap() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 0, 3, Direction::East);
        grid.set(3, 3, Cell::Splitter(SplitterKind::Back));
        grid.set(3, 5, Cell::Splitter(SplitterKind::Back));
        grid.set(5, 3, Cell::Splitter(SplitterKind::Forward));
        grid.set(5, 5, Cell::Splitter(SplitterKind::Forward));
        let result = trace(&grid, &[em]);
        assert!(!result.segments.is_empty());
    }

    #[test]
    fn trace_does_not_mutate_grid() {
        let mut grid = empty_room(8, 8);
        let em = emitter(&mut grid, 4, 7, Direction::North);
        grid.set(4, 4, Cell::Mirror(MirrorAngle::Deg135));
        let before = grid.clone();
        let _ = trace(&grid, &[em]);
        for (pos, cell) in before.iter() {
            assert_eq!(grid.get(pos.0, pos.1), cell);
        }
    }

    #[test]
    fn animated_mirror_sweeps_beam_continuously() {
        let mut grid = empty_room(10, 10);
        let em = emitter(&mut grid, 4, 9, Direction::North);
        grid.set(4, 4, Cell::Mirror(MirrorAngle::Deg45));

        // Mid-rotation between 45° and 90°: beam leaves at a non-cardinal
        // angle and must still terminate inside the grid walls.
        let mut anims = AnimMap::new();
        anims.insert(
            (4, 4),
            MirrorAnim {
                from_theta: MirrorAngle::Deg45.theta(),
                to_theta: MirrorAngle::Deg90.theta(),
                progress: 0.5,
            },
        );
        let result = trace_animated(&grid, &[em], &anims);
        assert!(result.lit_cells.contains(&(4, 4)));
        assert!(!result.segments.is_empty());

        // At progress 0 the sweep matches the discrete table's direction:
        // northbound beam leaves west toward the x=0 wall.
        anims.get_mut(&(4, 4)).expect("anim present").progress = 0.0;
        let at_rest = trace_animated(&grid, &[em], &anims);
        assert!(at_rest.lit_cells.contains(&(1, 4)));
    }

    #[test]
    fn animated_trace_reflects_off_static_mirrors_downstream() {
        let mut grid = empty_room(10, 10);
        let em = emitter(&mut grid, 4, 9, Direction::North);
        grid.set(4, 4, Cell::Mirror(MirrorAngle::Deg45));
        grid.set(1, 4, Cell::Mirror(MirrorAngle::Deg135)); // west -> south
        grid.set(1, 8, Cell::Target);

        let mut anims = AnimMap::new();
        anims.insert(
            (4, 4),
            MirrorAnim {
                from_theta: MirrorAngle::Deg45.theta(),
                to_theta: MirrorAngle::Deg90.theta(),
                progress: 0.0,
            },
        );
        let result = trace_animated(&grid, &[em], &anims);
        assert!(result.targets_hit.contains(&(1, 8)));
    }
}
