//! Fruit Drop - rules core for a falling-object merge puzzle
//!
//! Core modules:
//! - `sim`: Deterministic game rules (spawning, merging, danger, dropping)
//! - `tuning`: Data-driven game balance
//! - `hud`: Presentation-facing snapshot of a round
//!
//! Rigid-body dynamics are owned by whatever implements
//! [`sim::PhysicsWorld`]; `sim::RapierWorld` provides them on rapier2d.

pub mod hud;
pub mod sim;
pub mod tuning;

pub use hud::HudSnapshot;
pub use tuning::{Tuning, TuningError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one physics tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Logical field dimensions (y grows downward)
    pub const LOGICAL_WIDTH: f32 = 360.0;
    pub const LOGICAL_HEIGHT: f32 = 640.0;

    /// Thickness of the ground and side walls
    pub const WALL_THICKNESS: f32 = 2000.0;
    /// Visual floor sits this far above the bottom edge
    pub const FLOOR_OFFSET: f32 = 30.0;
    /// Objects resting above this line for too long end the round
    pub const DEADLINE_Y: f32 = 130.0;

    /// Where the held object hovers before release
    pub const HELD_Y: f32 = 50.0;
}

/// Convert a duration in milliseconds to whole simulation ticks
#[inline]
pub fn ms_to_ticks(ms: u32) -> u64 {
    (ms as f32 / (consts::SIM_DT * 1000.0)).round() as u64
}

/// Y coordinate of the visual floor line
#[inline]
pub fn floor_line_y(height: f32, floor_offset: f32) -> f32 {
    height - floor_offset
}

/// Clamp a circle center so the whole circle stays inside [0, width]
/// horizontally and does not cross below `floor_y`.
pub fn clamp_circle_to_field(center: Vec2, radius: f32, width: f32, floor_y: f32) -> Vec2 {
    let mut p = center;
    if p.y + radius > floor_y {
        p.y = floor_y - radius;
    }
    if p.x - radius < 0.0 {
        p.x = radius;
    }
    if p.x + radius > width {
        p.x = width - radius;
    }
    p
}
