//! Deterministic puzzle simulation: grid cells and optics, beam tracing,
//! procedural level generation and per-tick game state. No rendering or
//! platform dependencies live here; the host loop feeds input and a fixed
//! timestep in and draws from the resulting state.

pub mod cell;
pub mod generate;
pub mod level;
pub mod tick;
pub mod trace;

pub use cell::{Cell, Direction, MirrorAngle, SplitterKind};
pub use generate::{fallback_level, generate, tier_for, Tier};
pub use level::{
    ChargeNode, DoorLink, Emitter, Grid, GridPos, Level, PlayerStart, SolutionMirror,
};
pub use tick::{tick, LevelPhase, LevelState, RotatingMirror, TickInput};
pub use trace::{trace, trace_animated, AnimMap, BeamSegment, MirrorAnim, TraceResult};
