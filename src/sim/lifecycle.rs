//! Fruit lifecycle: creation, grow-in after a merge, spawn grace period,
//! and reaping of anything that escaped the field.
//!
//! Per-fruit game state lives in a side table keyed by [`BodyHandle`]; the
//! physics world only ever sees plain circles.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::world::{BodyDesc, BodyHandle, BodyTag, PhysicsWorld};
use crate::tuning::Tuning;

/// Grow-in animation of a freshly merged fruit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    pub current_scale: f32,
    pub target_scale: f32,
    /// Per-tick growth rate (scale multiplies by `1 + speed`)
    pub speed: f32,
}

/// Result of one growth tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthStep {
    /// Factor to rescale the body by this tick
    pub factor: f32,
    pub finished: bool,
}

impl Growth {
    pub fn new(start_scale: f32, speed: f32) -> Self {
        Self {
            current_scale: start_scale,
            target_scale: 1.0,
            speed,
        }
    }

    /// Advance one tick. The final step is shortened so the scale lands
    /// exactly on the target.
    pub fn advance(&mut self) -> GrowthStep {
        let factor = 1.0 + self.speed;
        let previous = self.current_scale;
        let next = previous * factor;
        if next >= self.target_scale {
            self.current_scale = self.target_scale;
            GrowthStep {
                factor: self.target_scale / previous,
                finished: true,
            }
        } else {
            self.current_scale = next;
            GrowthStep {
                factor,
                finished: false,
            }
        }
    }
}

/// Game-side state of one fruit body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FruitMeta {
    pub tier: u8,
    /// Exempt from danger detection until settled or below the deadline
    pub invulnerable: bool,
    /// Ticks spent as a dynamic body
    pub age_ticks: u32,
    pub growth: Option<Growth>,
}

impl FruitMeta {
    pub fn is_growing(&self) -> bool {
        self.growth.is_some()
    }

    /// Whether danger detection should skip this fruit
    pub fn is_exempt(&self) -> bool {
        self.invulnerable || self.is_growing()
    }
}

/// Owner of the fruit side table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lifecycle {
    fruits: BTreeMap<BodyHandle, FruitMeta>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&FruitMeta> {
        self.fruits.get(&handle)
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut FruitMeta> {
        self.fruits.get_mut(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BodyHandle, &FruitMeta)> {
        self.fruits.iter()
    }

    fn fruit_desc(tuning: &Tuning, tier: u8, pos: Vec2) -> BodyDesc {
        let radius = tuning.tiers[tier as usize].radius;
        BodyDesc::circle(pos, radius, tuning.material, BodyTag::Fruit(tier))
    }

    /// Create the player-controlled fruit: static and invulnerable
    pub fn spawn_held(
        &mut self,
        world: &mut impl PhysicsWorld,
        tuning: &Tuning,
        tier: u8,
        pos: Vec2,
    ) -> BodyHandle {
        let handle = world.insert(Self::fruit_desc(tuning, tier, pos).with_static(true));
        self.fruits.insert(
            handle,
            FruitMeta {
                tier,
                invulnerable: true,
                age_ticks: 0,
                growth: None,
            },
        );
        log::debug!("Spawned held tier {} as {:?}", tier, handle);
        handle
    }

    /// Create the result of a merge: dynamic, at rest, growing in from
    /// the size of the tier it came from.
    pub fn spawn_merged(
        &mut self,
        world: &mut impl PhysicsWorld,
        tuning: &Tuning,
        from_tier: u8,
        tier: u8,
        pos: Vec2,
    ) -> BodyHandle {
        let handle = world.insert(Self::fruit_desc(tuning, tier, pos));
        let start_scale = tuning.tiers[from_tier as usize].radius / tuning.tiers[tier as usize].radius;
        world.rescale(handle, start_scale);
        world.set_velocity(handle, Vec2::ZERO);
        world.set_angular_velocity(handle, 0.0);
        self.fruits.insert(
            handle,
            FruitMeta {
                tier,
                invulnerable: false,
                age_ticks: 0,
                growth: Some(Growth::new(start_scale, tuning.grow_speed)),
            },
        );
        handle
    }

    /// Remove a fruit from the world and the side table
    pub fn despawn(&mut self, world: &mut impl PhysicsWorld, handle: BodyHandle) {
        world.remove(handle);
        self.fruits.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.fruits.clear();
    }

    /// Per-tick bookkeeping. Returns the fruit reaped for leaving the field.
    pub fn update(&mut self, world: &mut impl PhysicsWorld, tuning: &Tuning) -> Vec<BodyHandle> {
        let reap_below = tuning.field_height + tuning.wall_thickness;
        let mut reaped = Vec::new();
        let mut gone = Vec::new();

        for (&handle, meta) in self.fruits.iter_mut() {
            let Some(body) = world.body(handle) else {
                gone.push(handle);
                continue;
            };

            if !body.is_static {
                meta.age_ticks = meta.age_ticks.saturating_add(1);
            }

            if let Some(growth) = meta.growth.as_mut() {
                let step = growth.advance();
                world.rescale(handle, step.factor);
                if step.finished {
                    meta.growth = None;
                }
            }

            if meta.invulnerable {
                let below_deadline = body.pos.y - body.circle_radius() > tuning.deadline_y;
                let settled = meta.age_ticks >= tuning.invulnerable_min_ticks
                    && body.speed() < tuning.rest_speed;
                if below_deadline || settled {
                    meta.invulnerable = false;
                }
            }

            if !body.is_static && body.pos.y > reap_below {
                reaped.push(handle);
            }
        }

        for handle in gone {
            self.fruits.remove(&handle);
        }
        for &handle in &reaped {
            log::debug!("Reaped escaped fruit {:?}", handle);
            self.despawn(world, handle);
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RapierWorld;
    use proptest::prelude::*;

    #[test]
    fn test_growth_lands_on_one() {
        let mut growth = Growth::new(16.0 / 24.0, 0.06);
        let mut applied = growth.current_scale;
        let mut ticks = 0;
        loop {
            let step = growth.advance();
            applied *= step.factor;
            ticks += 1;
            if step.finished {
                break;
            }
        }
        assert_eq!(growth.current_scale, 1.0);
        assert!((applied - 1.0).abs() < 1e-5);
        // ln(1.5) / ln(1.06) ≈ 6.96
        assert_eq!(ticks, 7);
    }

    #[test]
    fn test_merged_fruit_grows_in() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_merged(&mut world, &tuning, 0, 1, Vec2::new(180.0, 400.0));
        assert!((world.body(h).unwrap().circle_radius() - 16.0).abs() < 1e-4);
        assert!(lifecycle.get(h).unwrap().is_growing());

        for _ in 0..20 {
            lifecycle.update(&mut world, &tuning);
        }
        let meta = lifecycle.get(h).unwrap();
        assert!(!meta.is_growing());
        assert!(!meta.invulnerable);
        assert!((world.body(h).unwrap().circle_radius() - 24.0).abs() < 1e-3);
    }

    #[test]
    fn test_held_fruit_is_static_and_invulnerable() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_held(&mut world, &tuning, 0, Vec2::new(180.0, 50.0));
        assert!(world.body(h).unwrap().is_static);

        // Static fruit never ages, so it stays invulnerable while held
        for _ in 0..200 {
            lifecycle.update(&mut world, &tuning);
        }
        let meta = lifecycle.get(h).unwrap();
        assert!(meta.invulnerable);
        assert_eq!(meta.age_ticks, 0);
    }

    #[test]
    fn test_invulnerability_clears_below_deadline() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_held(&mut world, &tuning, 0, Vec2::new(180.0, 50.0));
        world.set_static(h, false);
        world.set_position(h, Vec2::new(180.0, 130.0 + 16.0 + 0.5));
        world.set_velocity(h, Vec2::new(0.0, 5.0));
        lifecycle.update(&mut world, &tuning);
        assert!(!lifecycle.get(h).unwrap().invulnerable);
    }

    #[test]
    fn test_invulnerability_clears_once_settled() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_held(&mut world, &tuning, 0, Vec2::new(180.0, 100.0));
        world.set_static(h, false);

        for _ in 0..59 {
            lifecycle.update(&mut world, &tuning);
        }
        assert!(lifecycle.get(h).unwrap().invulnerable);
        lifecycle.update(&mut world, &tuning);
        assert!(!lifecycle.get(h).unwrap().invulnerable);
    }

    #[test]
    fn test_moving_fruit_above_deadline_stays_invulnerable() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_held(&mut world, &tuning, 0, Vec2::new(180.0, 100.0));
        world.set_static(h, false);
        world.set_velocity(h, Vec2::new(1.0, 0.0));
        for _ in 0..500 {
            lifecycle.update(&mut world, &tuning);
        }
        assert!(lifecycle.get(h).unwrap().invulnerable);
    }

    #[test]
    fn test_escaped_fruit_reaped() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        let h = lifecycle.spawn_merged(&mut world, &tuning, 0, 1, Vec2::new(180.0, 3000.0));
        let reaped = lifecycle.update(&mut world, &tuning);
        assert_eq!(reaped, vec![h]);
        assert!(world.body(h).is_none());
        assert!(lifecycle.get(h).is_none());
    }

    #[test]
    fn test_vanished_bodies_pruned() {
        let tuning = Tuning::default();
        let mut world = RapierWorld::new();
        let mut lifecycle = Lifecycle::new();
        lifecycle.spawn_merged(&mut world, &tuning, 0, 1, Vec2::new(180.0, 300.0));
        world.clear(false);
        lifecycle.update(&mut world, &tuning);
        assert!(lifecycle.is_empty());
    }

    proptest! {
        #[test]
        fn prop_growth_converges(start in 0.05f32..0.999, speed in 0.001f32..0.5) {
            let mut growth = Growth::new(start, speed);
            let mut finished = false;
            for _ in 0..10_000 {
                if growth.advance().finished {
                    finished = true;
                    break;
                }
            }
            prop_assert!(finished);
            prop_assert_eq!(growth.current_scale, 1.0);
        }
    }
}
