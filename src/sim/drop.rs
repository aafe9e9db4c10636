//! Aiming and releasing the held fruit
//!
//! While the drop gate is open, pointer input only slides the held (static)
//! fruit along the top of the field. Release hands it to the physics world
//! with a random orientation and a little spin.

use glam::Vec2;
use rand::Rng;

use super::state::RoundState;
use super::world::{BodyHandle, PhysicsWorld};
use crate::tuning::Tuning;

/// Mapping from client pixels to logical field units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Client x of the field's left edge
    pub left: f32,
    /// Rendered field width in client pixels
    pub rendered_width: f32,
    /// Logical field width
    pub logical_width: f32,
}

impl Viewport {
    pub fn new(left: f32, rendered_width: f32, logical_width: f32) -> Self {
        Self {
            left,
            rendered_width,
            logical_width,
        }
    }

    /// Viewport whose client pixels equal field units
    pub fn identity(logical_width: f32) -> Self {
        Self::new(0.0, logical_width, logical_width)
    }

    /// Logical units per client pixel
    pub fn scale(&self) -> f32 {
        if self.rendered_width > 0.0 {
            self.logical_width / self.rendered_width
        } else {
            1.0
        }
    }

    pub fn to_logical_x(&self, client_x: f32) -> f32 {
        (client_x - self.left) * self.scale()
    }
}

/// Keep a circle of `radius` fully inside [0, width]
pub fn clamp_held_x(x: f32, radius: f32, width: f32) -> f32 {
    x.max(radius).min(width - radius)
}

/// The held fruit, if input may currently act on it
fn controllable(round: &RoundState) -> Option<BodyHandle> {
    if !round.can_drop || round.is_game_over() {
        return None;
    }
    round.held
}

/// Slide the held fruit to follow the pointer. Returns the new logical x,
/// or `None` when input is currently ignored.
pub fn move_held(
    round: &RoundState,
    world: &mut impl PhysicsWorld,
    tuning: &Tuning,
    client_x: f32,
    viewport: &Viewport,
) -> Option<f32> {
    let handle = controllable(round)?;
    let body = world.body(handle)?;
    let x = clamp_held_x(
        viewport.to_logical_x(client_x),
        body.circle_radius(),
        tuning.field_width,
    );
    world.set_position(handle, Vec2::new(x, tuning.held_y));
    Some(x)
}

/// Let go of the held fruit. Closes the drop gate and returns the released
/// handle, or `None` when release is currently ignored.
pub fn release<R: Rng + ?Sized>(
    round: &mut RoundState,
    world: &mut impl PhysicsWorld,
    tuning: &Tuning,
    rng: &mut R,
) -> Option<BodyHandle> {
    let handle = controllable(round)?;
    round.can_drop = false;
    round.held = None;

    world.set_static(handle, false);
    world.set_angle(handle, rng.random_range(0.0..std::f32::consts::TAU));
    let spin = if tuning.max_spin > 0.0 {
        rng.random_range(-tuning.max_spin..tuning.max_spin)
    } else {
        0.0
    };
    world.set_angular_velocity(handle, spin);
    Some(handle)
}
