//! Round state and the context that owns it
//!
//! Exactly one [`RoundState`] is live at a time; a restart replaces it
//! wholesale. [`GameState`] wraps it with everything that outlives a round:
//! the seeded RNG, the tick counter, the fruit side table and the task queue.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::danger::{DangerMonitor, DangerPhase};
use super::lifecycle::Lifecycle;
use super::schedule::Scheduler;
use super::world::BodyHandle;

/// Things the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A new fruit is held; `next_tier` is the preview after it
    Spawned { tier: u8, next_tier: u8 },
    /// The held fruit was let go at `x`
    Dropped { tier: u8, x: f32 },
    /// Two fruit of `tier` merged at `at`
    Merged {
        tier: u8,
        score_awarded: u32,
        at: Vec2,
        /// Tier of the replacement (None at the terminal tier)
        produced: Option<u8>,
    },
    /// Danger counter went from zero to one
    DangerStarted,
    GameOver { final_score: u64 },
    Restarted,
}

/// Per-round rules state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    /// Never decreases within a round
    pub score: u64,
    /// The single player-controlled fruit, if any
    pub held: Option<BodyHandle>,
    /// Whether the held fruit may currently be moved or released
    pub can_drop: bool,
    /// Preview of the tier offered after the held one
    pub next_tier: u8,
    pub danger: DangerMonitor,
    /// Score frozen at game over
    pub final_score: Option<u64>,
}

impl RoundState {
    pub fn new(danger_tick_limit: u32) -> Self {
        Self {
            score: 0,
            held: None,
            can_drop: true,
            next_tier: 0,
            danger: DangerMonitor::new(danger_tick_limit),
            final_score: None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.danger.is_game_over()
    }

    pub fn phase(&self) -> DangerPhase {
        self.danger.phase()
    }
}

/// Complete game context (single owner, passed by reference to every hook)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation tick counter (keeps counting across restarts)
    pub time_ticks: u64,
    /// Rounds started so far, including the current one
    pub round_index: u32,
    pub round: RoundState,
    pub lifecycle: Lifecycle,
    pub scheduler: Scheduler,
    /// Pending presentation events, oldest first
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(seed: u64, danger_tick_limit: u32) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            round_index: 0,
            round: RoundState::new(danger_tick_limit),
            lifecycle: Lifecycle::new(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
        }
    }

    /// Throw away the round and everything scheduled for it
    pub fn reset_round(&mut self, danger_tick_limit: u32) {
        self.round = RoundState::new(danger_tick_limit);
        self.lifecycle.clear();
        self.scheduler.cancel_all();
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
