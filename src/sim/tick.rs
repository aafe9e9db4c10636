//! Fixed timestep game loop
//!
//! [`Game`] is the single owner of the round. The physics world is passed
//! in by `&mut` on every call: the pre-step hook runs before the world
//! integrates, the merge hook consumes the pairs the step reports.

use glam::Vec2;

use super::danger::{DangerPhase, count_violations};
use super::drop::{self, Viewport};
use super::merge::{resolve_merges, spawn_burst};
use super::schedule::Task;
use super::spawn::pick_next_tier;
use super::state::{GameEvent, GameState};
use super::world::{BodyDesc, BodyTag, ContactPair, PhysicsWorld};
use crate::consts::SIM_DT;
use crate::hud::{Aim, HudSnapshot, danger_intensity};
use crate::ms_to_ticks;
use crate::tuning::Tuning;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Latest pointer/touch x in client pixels
    pub pointer_x: Option<f32>,
    /// Pointer up / touch end
    pub release: bool,
    /// Start a new round
    pub restart: bool,
}

/// Round controller
#[derive(Debug, Clone)]
pub struct Game {
    pub state: GameState,
    pub tuning: Tuning,
    /// Client-to-field mapping for pointer input
    pub viewport: Viewport,
}

impl Game {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        Self {
            state: GameState::new(seed, tuning.danger_tick_limit),
            viewport: Viewport::identity(tuning.field_width),
            tuning,
        }
    }

    pub fn score(&self) -> u64 {
        self.state.round.score
    }

    pub fn is_game_over(&self) -> bool {
        self.state.round.is_game_over()
    }

    /// Build the container, start the world and offer the first fruit
    pub fn install(&mut self, world: &mut impl PhysicsWorld) {
        let t = &self.tuning;
        let (w, h, thick) = (t.field_width, t.field_height, t.wall_thickness);
        world.insert(BodyDesc::boundary(
            Vec2::new(w / 2.0, h + thick / 2.0 - t.floor_offset),
            Vec2::new(w + 200.0, thick),
            0.8,
            BodyTag::Ground,
        ));
        world.insert(BodyDesc::boundary(
            Vec2::new(-thick / 2.0, h / 2.0),
            Vec2::new(thick, h * 3.0),
            0.0,
            BodyTag::Boundary,
        ));
        world.insert(BodyDesc::boundary(
            Vec2::new(w + thick / 2.0, h / 2.0),
            Vec2::new(thick, h * 3.0),
            0.0,
            BodyTag::Boundary,
        ));

        log::info!("Round started with seed {}", self.state.seed);
        self.begin_round(world);
    }

    fn begin_round(&mut self, world: &mut impl PhysicsWorld) {
        self.state.round_index += 1;
        let bodies = world.snapshots();
        self.state.round.next_tier =
            pick_next_tier(&bodies, self.tuning.spawn_weight, &mut self.state.rng);
        world.start();
        self.spawn_next(world);
    }

    /// Offer the previewed tier as the new held fruit
    pub fn spawn_next(&mut self, world: &mut impl PhysicsWorld) {
        let round = &self.state.round;
        if round.is_game_over() || round.held.is_some() {
            return;
        }
        let tier = round.next_tier;
        let bodies = world.snapshots();
        let next_tier = pick_next_tier(&bodies, self.tuning.spawn_weight, &mut self.state.rng);

        let pos = Vec2::new(self.tuning.field_width / 2.0, self.tuning.held_y);
        let handle = self
            .state
            .lifecycle
            .spawn_held(world, &self.tuning, tier, pos);

        let round = &mut self.state.round;
        round.next_tier = next_tier;
        round.held = Some(handle);
        round.can_drop = true;
        self.state.push_event(GameEvent::Spawned { tier, next_tier });
    }

    /// Pointer/touch move. Returns the held fruit's new x when it moved.
    pub fn pointer_moved(&mut self, world: &mut impl PhysicsWorld, client_x: f32) -> Option<f32> {
        drop::move_held(&self.state.round, world, &self.tuning, client_x, &self.viewport)
    }

    /// Pointer up / touch end. Returns true when a fruit was dropped.
    pub fn release(&mut self, world: &mut impl PhysicsWorld) -> bool {
        let state = &mut self.state;
        let Some(handle) = drop::release(&mut state.round, world, &self.tuning, &mut state.rng)
        else {
            return false;
        };

        let tier = state.lifecycle.get(handle).map(|m| m.tier).unwrap_or(0);
        let x = world.body(handle).map(|b| b.pos.x).unwrap_or_default();
        state.push_event(GameEvent::Dropped { tier, x });

        let due = state.time_ticks + ms_to_ticks(self.tuning.spawn_delay_ms);
        state.scheduler.schedule(due, Task::SpawnNext);
        true
    }

    fn run_task(&mut self, world: &mut impl PhysicsWorld, task: Task) {
        match task {
            Task::SpawnNext => self.spawn_next(world),
            Task::RemoveBodies(handles) => {
                for handle in handles {
                    world.remove(handle);
                }
            }
        }
    }

    /// Pre-step hook: deferred tasks, lifecycle bookkeeping, danger scan
    pub fn before_step(&mut self, world: &mut impl PhysicsWorld) {
        if self.is_game_over() {
            return;
        }
        self.state.time_ticks += 1;

        for task in self.state.scheduler.take_due(self.state.time_ticks) {
            self.run_task(world, task);
        }

        self.state.lifecycle.update(world, &self.tuning);

        let bodies = world.snapshots();
        let violations = count_violations(
            &bodies,
            &self.state.lifecycle,
            self.state.round.held,
            &self.tuning,
        );
        if violations > 0 {
            log::trace!(
                "{} fruit over the deadline, danger {}",
                violations,
                self.state.round.danger.counter + 1
            );
        }

        match self.state.round.danger.record(violations > 0) {
            DangerPhase::GameOver => self.end_round(world),
            DangerPhase::Danger(1) => self.state.push_event(GameEvent::DangerStarted),
            _ => {}
        }
    }

    fn end_round(&mut self, world: &mut impl PhysicsWorld) {
        world.stop();
        let final_score = self.state.round.score;
        self.state.round.final_score = Some(final_score);
        self.state.round.can_drop = false;
        log::info!(
            "Game over after {} ticks with score {}",
            self.state.time_ticks,
            final_score
        );
        self.state.push_event(GameEvent::GameOver { final_score });
    }

    /// Collision-start hook: resolve merges and award score
    pub fn on_collision_start(&mut self, world: &mut impl PhysicsWorld, pairs: &[ContactPair]) {
        if self.is_game_over() || pairs.is_empty() {
            return;
        }
        let state = &mut self.state;
        let outcomes = resolve_merges(pairs, world, &mut state.lifecycle, &self.tuning);

        for outcome in outcomes {
            state.round.score += u64::from(outcome.score);

            if outcome.produced.is_some() && self.tuning.particle_count > 0 {
                let burst = spawn_burst(world, &self.tuning, outcome.at, &mut state.rng);
                let due = state.time_ticks + ms_to_ticks(self.tuning.particle_lifetime_ms);
                state.scheduler.schedule(due, Task::RemoveBodies(burst));
            }

            let produced = outcome
                .produced
                .and_then(|h| state.lifecycle.get(h))
                .map(|m| m.tier);
            state.push_event(GameEvent::Merged {
                tier: outcome.tier,
                score_awarded: outcome.score,
                at: outcome.at,
                produced,
            });
        }
    }

    /// Advance the round by one fixed timestep
    pub fn tick(&mut self, world: &mut impl PhysicsWorld, input: &TickInput) {
        if input.restart {
            self.restart(world);
        }
        if let Some(x) = input.pointer_x {
            self.pointer_moved(world, x);
        }
        if input.release {
            self.release(world);
        }

        if self.is_game_over() || !world.is_running() {
            return;
        }
        self.before_step(world);
        if self.is_game_over() {
            return;
        }
        let pairs = world.step(SIM_DT);
        self.on_collision_start(world, &pairs);
    }

    /// Clear the field (boundaries stay) and start a fresh round
    pub fn restart(&mut self, world: &mut impl PhysicsWorld) {
        let fruit: Vec<_> = self.state.lifecycle.iter().map(|(h, _)| *h).collect();
        for handle in fruit {
            world.remove(handle);
        }
        world.clear(true);
        self.state.reset_round(self.tuning.danger_tick_limit);
        self.state.push_event(GameEvent::Restarted);
        log::info!("Restarting (round {})", self.state.round_index + 1);
        self.begin_round(world);
    }

    /// Take all pending presentation events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.state.events)
    }

    /// Presentation-facing view of the round
    pub fn hud(&self, world: &impl PhysicsWorld) -> HudSnapshot {
        let round = &self.state.round;
        let time_ms = self.state.time_ticks as f32 * SIM_DT * 1000.0;
        let aim = round
            .held
            .filter(|_| round.can_drop && !round.is_game_over())
            .and_then(|h| world.body(h))
            .map(|b| Aim {
                x: b.pos.x,
                from_y: b.pos.y,
                to_y: self.tuning.floor_y(),
            });

        HudSnapshot {
            score: round.score,
            next_tier: round.next_tier,
            game_over: round.is_game_over(),
            final_score: round.final_score,
            danger_ticks: round.danger.counter,
            danger_intensity: danger_intensity(
                round.danger.counter,
                self.tuning.danger_tick_limit,
                time_ms,
            ),
            aim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BodyHandle, RapierWorld};

    fn installed(seed: u64) -> (Game, RapierWorld) {
        let mut game = Game::new(seed);
        let mut world = RapierWorld::new();
        game.install(&mut world);
        (game, world)
    }

    /// Loose, settled fruit placed straight into the round
    fn place_fruit(game: &mut Game, world: &mut RapierWorld, tier: u8, pos: Vec2) -> BodyHandle {
        let h = game
            .state
            .lifecycle
            .spawn_held(world, &game.tuning, tier, pos);
        world.set_static(h, false);
        if let Some(meta) = game.state.lifecycle.get_mut(h) {
            meta.invulnerable = false;
        }
        h
    }

    fn particles(world: &RapierWorld) -> usize {
        world
            .snapshots()
            .iter()
            .filter(|b| b.tag == BodyTag::Particle)
            .count()
    }

    #[test]
    fn test_install_spawns_held_fruit() {
        let (game, world) = installed(12345);
        let held = game.state.round.held.expect("held fruit");
        let body = world.body(held).unwrap();
        assert!(body.is_static);
        assert_eq!(body.tag, BodyTag::Fruit(0));
        assert_eq!(body.pos, Vec2::new(180.0, 50.0));
        assert!(world.is_running());
        // Ground, two walls, held fruit
        assert_eq!(world.len(), 4);
    }

    #[test]
    fn test_release_schedules_next_spawn() {
        let (mut game, mut world) = installed(1);
        let first = game.state.round.held.unwrap();
        game.tick(
            &mut world,
            &TickInput {
                release: true,
                ..Default::default()
            },
        );
        assert!(game.state.round.held.is_none());
        assert!(!world.body(first).unwrap().is_static);

        // Pointer input is ignored while waiting for the next fruit
        game.tick(
            &mut world,
            &TickInput {
                pointer_x: Some(10.0),
                ..Default::default()
            },
        );
        for _ in 0..27 {
            game.tick(&mut world, &TickInput::default());
        }
        assert!(game.state.round.held.is_none());
        game.tick(&mut world, &TickInput::default());
        let next = game.state.round.held.expect("next fruit after delay");
        assert_ne!(next, first);
        assert!(game.state.round.can_drop);
    }

    #[test]
    fn test_pointer_moves_held_fruit() {
        let (mut game, mut world) = installed(1);
        game.viewport = Viewport::new(10.0, 180.0, 360.0);
        let x = game.pointer_moved(&mut world, 60.0);
        assert_eq!(x, Some(100.0));
        let held = game.state.round.held.unwrap();
        assert_eq!(world.body(held).unwrap().pos, Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_no_tick_before_install() {
        let mut game = Game::new(1);
        let mut world = RapierWorld::new();
        game.tick(&mut world, &TickInput::default());
        assert_eq!(game.state.time_ticks, 0);
    }

    #[test]
    fn test_determinism() {
        let (mut g1, mut w1) = installed(99999);
        let (mut g2, mut w2) = installed(99999);
        let inputs = [
            TickInput {
                pointer_x: Some(40.0),
                ..Default::default()
            },
            TickInput {
                release: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        for _ in 0..20 {
            for input in &inputs {
                g1.tick(&mut w1, input);
                g2.tick(&mut w2, input);
            }
        }
        assert_eq!(g1.state.time_ticks, g2.state.time_ticks);
        assert_eq!(g1.score(), g2.score());
        assert_eq!(w1.snapshots(), w2.snapshots());
        assert_eq!(g1.drain_events(), g2.drain_events());
    }

    #[test]
    fn test_merge_bursts_particles() {
        let (mut game, mut world) = installed(5);
        let a = place_fruit(&mut game, &mut world, 0, Vec2::new(170.0, 400.0));
        let b = place_fruit(&mut game, &mut world, 0, Vec2::new(195.0, 400.0));
        game.on_collision_start(&mut world, &[ContactPair::new(a, b)]);
        assert_eq!(game.score(), 2);
        assert_eq!(particles(&world), 6);
        assert!(!game.state.scheduler.is_empty());
    }

    #[test]
    fn test_terminal_merge_has_no_burst() {
        let (mut game, mut world) = installed(5);
        let a = place_fruit(&mut game, &mut world, 10, Vec2::new(126.0, 400.0));
        let b = place_fruit(&mut game, &mut world, 10, Vec2::new(234.0, 400.0));
        game.on_collision_start(&mut world, &[ContactPair::new(a, b)]);

        assert_eq!(game.score(), 22);
        assert!(world.body(a).is_none());
        assert!(world.body(b).is_none());
        assert_eq!(particles(&world), 0);
        assert!(game.state.scheduler.is_empty());
        assert!(game.drain_events().contains(&GameEvent::Merged {
            tier: 10,
            score_awarded: 22,
            at: Vec2::new(180.0, 400.0),
            produced: None,
        }));
    }

    #[test]
    fn test_danger_started_once_per_run() {
        let (mut game, mut world) = installed(3);
        world.gravity = 0.0;
        place_fruit(&mut game, &mut world, 0, Vec2::new(80.0, 100.0));
        for _ in 0..30 {
            game.tick(&mut world, &TickInput::default());
        }

        let started = game
            .drain_events()
            .iter()
            .filter(|e| **e == GameEvent::DangerStarted)
            .count();
        assert_eq!(started, 1);
        assert_eq!(game.state.round.danger.counter, 30);
        assert_eq!(game.hud(&world).danger_ticks, 30);
    }
}
