//! Merge resolution
//!
//! Consumes one batch of collision-start pairs. Two dynamic fruit of the
//! same tier become one fruit of the next tier at their (clamped) midpoint.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use super::lifecycle::Lifecycle;
use super::world::{BodyDesc, BodyHandle, BodySnapshot, BodyTag, ContactPair, PhysicsWorld};
use crate::clamp_circle_to_field;
use crate::tuning::{Material, Tuning};

/// What a single merge did
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Tier of the two sources
    pub tier: u8,
    /// Score value of the source tier
    pub score: u32,
    /// Where the replacement appeared (or would have)
    pub at: Vec2,
    /// Replacement fruit, absent at the terminal tier
    pub produced: Option<BodyHandle>,
    pub sources: (BodyHandle, BodyHandle),
}

/// Shared tier of two bodies that may merge
pub fn merge_tier(a: &BodySnapshot, b: &BodySnapshot) -> Option<u8> {
    if a.is_static || b.is_static {
        return None;
    }
    match (a.tag, b.tag) {
        (BodyTag::Fruit(ta), BodyTag::Fruit(tb)) if ta == tb => Some(ta),
        _ => None,
    }
}

/// Midpoint of two sources, clamped so a fruit of `radius` stays in the
/// field and above the floor line.
pub fn merge_point(a: Vec2, b: Vec2, radius: f32, tuning: &Tuning) -> Vec2 {
    clamp_circle_to_field((a + b) / 2.0, radius, tuning.field_width, tuning.floor_y())
}

/// Resolve one collision-detection pass.
///
/// Each unordered pair is handled at most once, and a fruit consumed by an
/// earlier merge in the batch takes no part in later ones.
pub fn resolve_merges(
    pairs: &[ContactPair],
    world: &mut impl PhysicsWorld,
    lifecycle: &mut Lifecycle,
    tuning: &Tuning,
) -> Vec<MergeOutcome> {
    let mut seen = BTreeSet::new();
    let mut consumed = BTreeSet::new();
    let mut outcomes = Vec::new();
    let terminal = tuning.terminal_tier();

    for pair in pairs {
        let key = pair.key();
        if !seen.insert(key) {
            continue;
        }
        if consumed.contains(&pair.a) || consumed.contains(&pair.b) {
            continue;
        }
        let (Some(a), Some(b)) = (world.body(pair.a), world.body(pair.b)) else {
            continue;
        };
        let Some(tier) = merge_tier(&a, &b) else {
            continue;
        };

        consumed.insert(pair.a);
        consumed.insert(pair.b);
        lifecycle.despawn(world, pair.a);
        lifecycle.despawn(world, pair.b);

        let score = tuning.tiers[tier as usize].score;
        let (at, produced) = if tier < terminal {
            let next = tier + 1;
            let at = merge_point(a.pos, b.pos, tuning.tiers[next as usize].radius, tuning);
            let handle = lifecycle.spawn_merged(world, tuning, tier, next, at);
            (at, Some(handle))
        } else {
            ((a.pos + b.pos) / 2.0, None)
        };

        log::debug!(
            "Merged tier {} at ({:.1}, {:.1}) for {} points",
            tier,
            at.x,
            at.y,
            score
        );
        outcomes.push(MergeOutcome {
            tier,
            score,
            at,
            produced,
            sources: key,
        });
    }

    outcomes
}

/// Cosmetic burst of sensor particles radiating from `at`.
/// The caller is responsible for removing them later.
pub fn spawn_burst<R: Rng + ?Sized>(
    world: &mut impl PhysicsWorld,
    tuning: &Tuning,
    at: Vec2,
    rng: &mut R,
) -> Vec<BodyHandle> {
    let material = Material {
        restitution: 0.0,
        friction: 0.0,
        air_drag: 0.1,
        density: 0.001,
    };
    (0..tuning.particle_count)
        .map(|_| {
            let handle = world.insert(
                BodyDesc::circle(at, tuning.particle_radius, material, BodyTag::Particle)
                    .with_sensor(true),
            );
            let angle: f32 = rng.random_range(0.0..std::f32::consts::TAU);
            world.set_velocity(handle, Vec2::from_angle(angle) * tuning.particle_speed);
            handle
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RapierWorld;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn dynamic_fruit(world: &mut RapierWorld, lc: &mut Lifecycle, tier: u8, pos: Vec2) -> BodyHandle {
        let tuning = Tuning::default();
        let h = lc.spawn_held(world, &tuning, tier, pos);
        world.set_static(h, false);
        h
    }

    #[test]
    fn test_same_tier_merges_once() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lc = Lifecycle::new();
        let a = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(100.0, 400.0));
        let b = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(130.0, 400.0));

        let pairs = [ContactPair::new(a, b), ContactPair::new(b, a)];
        let outcomes = resolve_merges(&pairs, &mut world, &mut lc, &tuning);
        assert_eq!(outcomes.len(), 1);
        let out = &outcomes[0];
        assert_eq!(out.tier, 0);
        assert_eq!(out.score, 2);
        assert_eq!(out.at, Vec2::new(115.0, 400.0));

        assert!(world.body(a).is_none());
        assert!(world.body(b).is_none());
        let merged = world.body(out.produced.unwrap()).unwrap();
        assert_eq!(merged.tag, BodyTag::Fruit(1));
        assert_eq!(merged.vel, Vec2::ZERO);
        assert!(lc.get(merged.handle).unwrap().is_growing());
    }

    #[test]
    fn test_different_tiers_ignored() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lc = Lifecycle::new();
        let a = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(100.0, 400.0));
        let b = dynamic_fruit(&mut world, &mut lc, 1, Vec2::new(130.0, 400.0));
        let outcomes = resolve_merges(&[ContactPair::new(a, b)], &mut world, &mut lc, &tuning);
        assert!(outcomes.is_empty());
        assert!(world.body(a).is_some() && world.body(b).is_some());
    }

    #[test]
    fn test_static_and_ground_ignored() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lc = Lifecycle::new();
        let held = lc.spawn_held(&mut world, &tuning, 0, Vec2::new(180.0, 50.0));
        let a = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(180.0, 70.0));
        let ground = world.insert(BodyDesc::boundary(
            Vec2::new(180.0, 1610.0),
            Vec2::new(560.0, 2000.0),
            0.8,
            BodyTag::Ground,
        ));
        let pairs = [ContactPair::new(held, a), ContactPair::new(a, ground)];
        assert!(resolve_merges(&pairs, &mut world, &mut lc, &tuning).is_empty());
        assert_eq!(world.len(), 3);
    }

    #[test]
    fn test_fruit_merges_at_most_once_per_batch() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lc = Lifecycle::new();
        let a = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(100.0, 400.0));
        let b = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(130.0, 400.0));
        let c = dynamic_fruit(&mut world, &mut lc, 0, Vec2::new(70.0, 400.0));
        let pairs = [ContactPair::new(a, b), ContactPair::new(a, c)];
        let outcomes = resolve_merges(&pairs, &mut world, &mut lc, &tuning);
        assert_eq!(outcomes.len(), 1);
        assert!(world.body(c).is_some());
    }

    #[test]
    fn test_terminal_tier_scores_without_replacement() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lc = Lifecycle::new();
        let a = dynamic_fruit(&mut world, &mut lc, 10, Vec2::new(126.0, 400.0));
        let b = dynamic_fruit(&mut world, &mut lc, 10, Vec2::new(234.0, 400.0));
        let outcomes = resolve_merges(&[ContactPair::new(a, b)], &mut world, &mut lc, &tuning);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].score, 22);
        assert!(outcomes[0].produced.is_none());
        assert!(world.is_empty());
        assert!(lc.is_empty());
    }

    #[test]
    fn test_merge_point_clamps_to_left_wall() {
        let tuning = Tuning::default();
        let p = merge_point(Vec2::new(0.0, 300.0), Vec2::new(5.0, 300.0), 40.0, &tuning);
        assert_eq!(p, Vec2::new(40.0, 300.0));
    }

    #[test]
    fn test_burst_spawns_sensors() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut rng = Pcg32::seed_from_u64(3);
        let burst = spawn_burst(&mut world, &tuning, Vec2::new(100.0, 100.0), &mut rng);
        assert_eq!(burst.len(), 6);
        for h in burst {
            let body = world.body(h).unwrap();
            assert_eq!(body.tag, BodyTag::Particle);
            assert!((body.speed() - 3.0).abs() < 1e-4);
        }
    }

    proptest! {
        #[test]
        fn prop_merge_point_in_bounds(
            ax in -200.0f32..600.0, ay in -200.0f32..900.0,
            bx in -200.0f32..600.0, by in -200.0f32..900.0,
            tier in 0usize..11,
        ) {
            let tuning = Tuning::default();
            let r = tuning.tiers[tier].radius;
            let p = merge_point(Vec2::new(ax, ay), Vec2::new(bx, by), r, &tuning);
            prop_assert!(p.x - r >= -1e-3);
            prop_assert!(p.x + r <= tuning.field_width + 1e-3);
            prop_assert!(p.y + r <= tuning.floor_y() + 1e-3);
        }
    }
}
