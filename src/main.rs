//! Fruit Drop headless runner
//!
//! Plays seeded rounds against the rapier physics world with a simple
//! autoplayer and logs how each one went.
//!
//! Usage: `fruit-drop [seed] [rounds] [tuning.json]`

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use fruit_drop::sim::{Game, GameEvent, RapierWorld, TickInput};
use fruit_drop::Tuning;

/// Give up on a round after this many ticks (10 minutes at 60 Hz)
const MAX_ROUND_TICKS: u64 = 60 * 60 * 10;

/// Drops fruit at random spots as soon as it is allowed to
struct AutoPlayer {
    rng: Pcg32,
    aim_x: Option<f32>,
}

impl AutoPlayer {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0x5EED_F00D),
            aim_x: None,
        }
    }

    /// Aim on one tick, release on the next
    fn input(&mut self, game: &Game) -> TickInput {
        let round = &game.state.round;
        if round.held.is_none() || !round.can_drop {
            return TickInput::default();
        }
        match self.aim_x.take() {
            Some(_) => TickInput {
                release: true,
                ..Default::default()
            },
            None => {
                let x = self.rng.random_range(0.0..game.tuning.field_width);
                self.aim_x = Some(x);
                TickInput {
                    pointer_x: Some(x),
                    ..Default::default()
                }
            }
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345u64);
    let rounds = args.next().and_then(|s| s.parse().ok()).unwrap_or(3u32);
    let tuning = args
        .next()
        .map(Tuning::load_or_default)
        .unwrap_or_default();

    log::info!("Fruit Drop (headless) starting: seed {}, {} rounds", seed, rounds);

    let mut game = Game::with_tuning(seed, tuning);
    let mut world = RapierWorld::new();
    let mut player = AutoPlayer::new(seed);
    let mut best: Option<u64> = None;

    game.install(&mut world);

    for round in 1..=rounds {
        if round > 1 {
            game.tick(
                &mut world,
                &TickInput {
                    restart: true,
                    ..Default::default()
                },
            );
        }

        let started = game.state.time_ticks;
        let mut merges = 0u32;
        while !game.is_game_over() && game.state.time_ticks - started < MAX_ROUND_TICKS {
            let input = player.input(&game);
            game.tick(&mut world, &input);

            for event in game.drain_events() {
                match event {
                    GameEvent::Merged { .. } => merges += 1,
                    GameEvent::GameOver { final_score } => {
                        best = best.max(Some(final_score));
                    }
                    _ => {}
                }
            }
        }

        let hud = game.hud(&world);
        println!(
            "round {:>2}: score {:>5}  merges {:>4}  ticks {:>6}  {}",
            round,
            hud.score,
            merges,
            game.state.time_ticks - started,
            if hud.game_over { "game over" } else { "time limit" }
        );
    }

    if let Some(best) = best {
        println!("best finished round: {}", best);
    }
}
