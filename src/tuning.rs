//! Data-driven game balance
//!
//! Every rule constant lives here so a round can be replayed with a
//! different balance file. Defaults match the shipped game.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::tier::{TierDef, default_tiers};

/// Physical material of a fruit body (handed to the physics world as-is)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub air_drag: f32,
    pub density: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.05,
            friction: 0.2,
            air_drag: 0.02,
            density: 0.001,
        }
    }
}

/// Errors raised while loading or validating a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tier table must contain at least one tier")]
    EmptyTiers,
    #[error("tier {index} radius {radius} must be larger than the previous tier")]
    NonIncreasingRadius { index: usize, radius: f32 },
    #[error("tier {index} score value must be positive")]
    ZeroScore { index: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Game balance knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Ordered tier definitions, smallest first
    pub tiers: Vec<TierDef>,
    pub material: Material,

    // === Field ===
    pub field_width: f32,
    pub field_height: f32,
    pub wall_thickness: f32,
    pub floor_offset: f32,
    pub deadline_y: f32,
    pub held_y: f32,

    // === Lifecycle ===
    /// Per-tick multiplicative growth of a freshly merged object
    pub grow_speed: f32,
    /// Minimum age before a settled object loses invulnerability
    pub invulnerable_min_ticks: u32,
    /// Speed under which an object counts as settled
    pub rest_speed: f32,

    // === Danger ===
    /// Game over once consecutive danger ticks exceed this
    pub danger_tick_limit: u32,

    // === Drop ===
    pub spawn_delay_ms: u32,
    /// Released objects spin at up to ± this (radians per tick)
    pub max_spin: f32,
    /// Pool entries per spawnable tier
    pub spawn_weight: usize,

    // === Merge burst ===
    pub particle_count: u32,
    pub particle_radius: f32,
    pub particle_speed: f32,
    pub particle_lifetime_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            material: Material::default(),

            field_width: LOGICAL_WIDTH,
            field_height: LOGICAL_HEIGHT,
            wall_thickness: WALL_THICKNESS,
            floor_offset: FLOOR_OFFSET,
            deadline_y: DEADLINE_Y,
            held_y: HELD_Y,

            grow_speed: 0.06,
            invulnerable_min_ticks: 60,
            rest_speed: 0.2,

            danger_tick_limit: 180,

            spawn_delay_ms: 500,
            max_spin: 0.1,
            spawn_weight: 3,

            particle_count: 6,
            particle_radius: 4.0,
            particle_speed: 3.0,
            particle_lifetime_ms: 400,
        }
    }
}

impl Tuning {
    /// Y of the visual floor line
    pub fn floor_y(&self) -> f32 {
        crate::floor_line_y(self.field_height, self.floor_offset)
    }

    /// Index of the last tier (no merge target beyond it)
    pub fn terminal_tier(&self) -> u8 {
        self.tiers.len().saturating_sub(1) as u8
    }

    /// Parse and validate a tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load a tuning file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring tuning file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Check tier-table and field invariants
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.tiers.is_empty() {
            return Err(TuningError::EmptyTiers);
        }
        if self.tiers.len() > u8::MAX as usize {
            return Err(TuningError::InvalidConfig("too many tiers"));
        }
        let mut prev = 0.0;
        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.radius <= prev {
                return Err(TuningError::NonIncreasingRadius {
                    index,
                    radius: tier.radius,
                });
            }
            if tier.score == 0 {
                return Err(TuningError::ZeroScore { index });
            }
            prev = tier.radius;
        }
        if self.field_width <= 2.0 * prev {
            return Err(TuningError::InvalidConfig(
                "field must be wider than the largest tier",
            ));
        }
        if self.spawn_weight == 0 {
            return Err(TuningError::InvalidConfig("spawn_weight must be non-zero"));
        }
        if self.grow_speed <= 0.0 {
            return Err(TuningError::InvalidConfig("grow_speed must be positive"));
        }
        Ok(())
    }
}
