//! Laser Maze - first-person mirror puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (cell taxonomy, beam tracing, level
//!   generation, rotation/charge state machine)
//! - `settings`: Data-driven scoring configuration
//!
//! Rendering, input polling and player movement live outside this crate; they
//! consume the grid, beam segments and animation records exposed by `sim` and
//! never mutate them.

pub mod settings;
pub mod sim;

pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Seconds for one 45-degree mirror rotation
    pub const MIRROR_ANIM_DURATION: f32 = 1.0;
    /// Seconds of continuous illumination to fully charge a target
    pub const CHARGE_FILL_TIME: f32 = 3.0;
    /// Seconds for a full charge's worth of decay when illumination stops
    pub const CHARGE_DECAY_TIME: f32 = 1.5;

    /// Per-branch cell step bound for the discrete tracer
    pub const MAX_BEAM_STEPS: usize = 64;
    /// Beam branch depth bound (splitter forks)
    pub const MAX_BRANCH_DEPTH: u32 = 12;
    /// Sub-cell step size for the continuous tracer, in grid units
    pub const SUB_STEP: f32 = 0.05;
    /// Sub-step bound per continuous branch
    pub const MAX_SUB_STEPS: usize = 600;
    /// Branch depth bound for continuous re-reflection off static optics
    pub const MAX_CONTINUOUS_DEPTH: u32 = 10;

    /// Generation attempts before falling back to the hardcoded level
    pub const GEN_MAX_ATTEMPTS: u32 = 100;
    /// Minimum Manhattan distance between emitters
    pub const EMITTER_MIN_SPACING: i32 = 3;
}

/// Center of a grid cell in grid-fractional coordinates
#[inline]
pub fn cell_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}
