//! Deadline monitor
//!
//! A round is lost when fruit sits at rest above the deadline for too many
//! consecutive ticks. One quiet tick forgives everything.

use serde::{Deserialize, Serialize};

use super::lifecycle::Lifecycle;
use super::world::{BodyHandle, BodySnapshot, BodyTag};
use crate::tuning::Tuning;

/// Where the round stands with respect to the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DangerPhase {
    Active,
    /// Consecutive ticks in violation so far
    Danger(u32),
    GameOver,
}

/// Does this body count as resting above the deadline?
pub fn is_violation(
    body: &BodySnapshot,
    lifecycle: &Lifecycle,
    held: Option<BodyHandle>,
    tuning: &Tuning,
) -> bool {
    if body.is_static || Some(body.handle) == held {
        return false;
    }
    if !matches!(body.tag, BodyTag::Fruit(_)) {
        return false;
    }
    if lifecycle.get(body.handle).is_some_and(|m| m.is_exempt()) {
        return false;
    }
    body.pos.y < tuning.deadline_y && body.vel.y.abs() < tuning.rest_speed
}

/// Number of fruit currently violating the deadline
pub fn count_violations<'a>(
    bodies: impl IntoIterator<Item = &'a BodySnapshot>,
    lifecycle: &Lifecycle,
    held: Option<BodyHandle>,
    tuning: &Tuning,
) -> usize {
    bodies
        .into_iter()
        .filter(|b| is_violation(b, lifecycle, held, tuning))
        .count()
}

/// Consecutive-danger counter with a terminal game-over state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerMonitor {
    /// Consecutive ticks with at least one violation
    pub counter: u32,
    /// Game over once `counter` exceeds this
    pub limit: u32,
    game_over: bool,
}

impl DangerMonitor {
    pub fn new(limit: u32) -> Self {
        Self {
            counter: 0,
            limit,
            game_over: false,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn phase(&self) -> DangerPhase {
        if self.game_over {
            DangerPhase::GameOver
        } else if self.counter > 0 {
            DangerPhase::Danger(self.counter)
        } else {
            DangerPhase::Active
        }
    }

    /// Feed one tick's verdict and return the resulting phase
    pub fn record(&mut self, danger: bool) -> DangerPhase {
        if self.game_over {
            return DangerPhase::GameOver;
        }
        if danger {
            self.counter += 1;
            if self.counter > self.limit {
                self.game_over = true;
            }
        } else {
            self.counter = 0;
        }
        self.phase()
    }
}
