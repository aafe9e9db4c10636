//! Deterministic game rules
//!
//! All gameplay decisions live here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body handle)
//! - No rendering or platform dependencies
//!
//! Physics is someone else's job; see [`world::PhysicsWorld`].
//! [`physics::RapierWorld`] provides it on top of rapier2d.

pub mod danger;
pub mod drop;
pub mod lifecycle;
pub mod merge;
pub mod physics;
pub mod schedule;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod tier;
pub mod world;

pub use danger::{DangerMonitor, DangerPhase, count_violations, is_violation};
pub use drop::Viewport;
pub use lifecycle::{FruitMeta, Growth, Lifecycle};
pub use merge::{MergeOutcome, merge_point, resolve_merges};
pub use physics::RapierWorld;
pub use schedule::{Scheduler, Task};
pub use spawn::{pick_next_tier, spawn_ceiling};
pub use state::{GameEvent, GameState, RoundState};
pub use tick::{Game, TickInput};
pub use tier::{TIERS, TierDef};
pub use world::{BodyDesc, BodyHandle, BodyShape, BodySnapshot, BodyTag, ContactPair, PhysicsWorld};
