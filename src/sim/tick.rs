//! Per-frame level state: mirror rotation animation, charge integration,
//! door evaluation and the win check. Driven at a fixed timestep by the
//! host loop; everything here is deterministic in (state, input, dt).

use std::f32::consts::FRAC_PI_4;

use crate::consts::{CHARGE_DECAY_TIME, CHARGE_FILL_TIME, MIRROR_ANIM_DURATION};
use crate::settings::Settings;

use super::cell::{Cell, MirrorAngle};
use super::level::{ChargeNode, GridPos, Level};
use super::trace::{trace, trace_animated, AnimMap, MirrorAnim, TraceResult};

/// Input relayed from the interaction layer, sampled once per tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Mirror cell the player activated this tick, if any
    pub rotate: Option<GridPos>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPhase {
    Playing,
    Cleared,
}

/// A mirror mid-rotation. At most one exists at a time.
#[derive(Debug, Clone, Copy)]
pub struct RotatingMirror {
    pub pos: GridPos,
    /// Orientation committed to the grid when the animation completes
    pub to: MirrorAngle,
    pub anim: MirrorAnim,
}

/// One running level instance
#[derive(Debug, Clone)]
pub struct LevelState {
    pub level: Level,
    /// Beam geometry and hit sets for the current frame
    pub beams: TraceResult,
    rotation: Option<RotatingMirror>,
    pub elapsed: f32,
    pub phase: LevelPhase,
}

impl LevelState {
    pub fn new(level: Level) -> Self {
        let beams = trace(&level.grid, &level.emitters);
        Self {
            level,
            beams,
            rotation: None,
            elapsed: 0.0,
            phase: LevelPhase::Playing,
        }
    }

    /// The in-flight rotation, for renderers that draw the sweep
    pub fn rotation(&self) -> Option<&RotatingMirror> {
        self.rotation.as_ref()
    }

    /// Score for a cleared level: base plus time bonus under par
    pub fn completion_score(&self, settings: &Settings) -> u64 {
        let under_par = (self.level.par_time - self.elapsed).max(0.0);
        settings.base_clear_score + (under_par * settings.time_bonus_per_sec) as u64
    }

    fn retrace(&mut self) {
        self.beams = match self.rotation {
            Some(rot) => {
                let mut anims = AnimMap::new();
                anims.insert(rot.pos, rot.anim);
                trace_animated(&self.level.grid, &self.level.emitters, &anims)
            }
            None => trace(&self.level.grid, &self.level.emitters),
        };
    }
}

/// Advance the level by `dt` seconds
pub fn tick(state: &mut LevelState, input: &TickInput, dt: f32) {
    if state.phase == LevelPhase::Cleared {
        return;
    }
    state.elapsed += dt;

    // Rotation requests are dropped while another rotation is in flight
    if state.rotation.is_none() {
        if let Some(pos) = input.rotate {
            if let Cell::Mirror(angle) = state.level.grid.get(pos.0, pos.1) {
                let from = angle.theta();
                state.rotation = Some(RotatingMirror {
                    pos,
                    to: angle.next(),
                    anim: MirrorAnim {
                        from_theta: from,
                        to_theta: from + FRAC_PI_4,
                        progress: 0.0,
                    },
                });
            }
        }
    }

    if let Some(rot) = state.rotation.as_mut() {
        rot.anim.progress += dt / MIRROR_ANIM_DURATION;
    }
    let finished = state
        .rotation
        .as_ref()
        .is_some_and(|r| r.anim.progress >= 1.0);
    if finished {
        if let Some(rot) = state.rotation.take() {
            state.level.grid.set(rot.pos.0, rot.pos.1, Cell::Mirror(rot.to));
        }
        state.retrace();
    } else if state.rotation.is_some() {
        state.retrace();
    }

    // Charge integration against this frame's hit sets
    for node in &mut state.level.targets {
        apply_charge(node, state.beams.targets_hit.contains(&node.pos), dt);
    }
    for node in &mut state.level.switches {
        apply_charge(node, state.beams.switches_hit.contains(&node.pos), dt);
    }

    // Doors open (monotonically) once every linked switch is locked
    let mut opened = false;
    for i in 0..state.level.doors.len() {
        let link = &state.level.doors[i];
        if link.open {
            continue;
        }
        let all_locked = link
            .switches
            .iter()
            .all(|pos| state.level.switch_at(*pos).is_some_and(ChargeNode::is_locked));
        if all_locked {
            log::info!("door at {:?} opened", link.door);
            state.level.open_door(i);
            opened = true;
        }
    }
    if opened {
        state.retrace();
    }

    if state.level.all_targets_locked() {
        state.phase = LevelPhase::Cleared;
        log::info!("level cleared in {:.1}s", state.elapsed);
    }
}

/// Locked nodes are immune; others fill while lit and decay while dark
fn apply_charge(node: &mut ChargeNode, lit: bool, dt: f32) {
    if node.is_locked() {
        return;
    }
    if lit {
        node.charge = (node.charge + dt / CHARGE_FILL_TIME).min(1.0);
    } else {
        node.charge = (node.charge - dt / CHARGE_DECAY_TIME).max(0.0);
    }
}
