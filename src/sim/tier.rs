//! Tier table: the size classes fruit move through as they merge

use serde::{Deserialize, Serialize};

/// One size class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierDef {
    /// Circle radius in field units
    pub radius: f32,
    /// Points awarded when two of this tier merge
    pub score: u32,
    /// Burst color as 0xRRGGBB
    pub color: u32,
}

impl TierDef {
    pub const fn new(radius: f32, score: u32, color: u32) -> Self {
        Self {
            radius,
            score,
            color,
        }
    }
}

/// The shipped tiers, cherry to watermelon
pub const TIERS: [TierDef; 11] = [
    TierDef::new(16.0, 2, 0xFF0000),
    TierDef::new(24.0, 4, 0xFF5555),
    TierDef::new(32.0, 6, 0xAA00AA),
    TierDef::new(38.0, 8, 0xFFAA00),
    TierDef::new(46.0, 10, 0xFF8800),
    TierDef::new(58.0, 12, 0xFF0000),
    TierDef::new(70.0, 14, 0xEEDD00),
    TierDef::new(84.0, 16, 0xFFBB88),
    TierDef::new(98.0, 18, 0xFFFF00),
    TierDef::new(112.0, 20, 0x00FF00),
    TierDef::new(126.0, 22, 0x008800),
];

pub fn default_tiers() -> Vec<TierDef> {
    TIERS.to_vec()
}
