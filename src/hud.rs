//! Presentation-facing round snapshot
//!
//! Everything a renderer or DOM overlay needs each frame, computed from the
//! simulation without touching it.

use serde::{Deserialize, Serialize};

/// Dashed aim guide from the held fruit down to the floor line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aim {
    pub x: f32,
    pub from_y: f32,
    pub to_y: f32,
}

/// One frame of HUD state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u64,
    /// Tier shown in the "next" preview
    pub next_tier: u8,
    pub game_over: bool,
    pub final_score: Option<u64>,
    /// Consecutive danger ticks so far
    pub danger_ticks: u32,
    /// Deadline glow in [0, 1]; zero when nothing is in danger
    pub danger_intensity: f32,
    /// Only while the held fruit can be dropped
    pub aim: Option<Aim>,
}

/// Pulsing deadline intensity.
///
/// Zero while the counter is zero. Otherwise a pulse around 0.7 whose
/// amplitude ramps up as the counter approaches `limit`.
pub fn danger_intensity(counter: u32, limit: u32, time_ms: f32) -> f32 {
    if counter == 0 {
        return 0.0;
    }
    let pulse = (time_ms * 0.015).sin();
    let ramp = (counter as f32 / limit.max(1) as f32).min(1.0);
    let base = 0.7 + 0.3 * pulse;
    (base * (0.5 + 0.5 * ramp)).clamp(0.0, 1.0)
}
