//! Physics collaborator interface
//!
//! The rules layer never integrates motion or detects contacts itself. It
//! talks to whatever rigid-body engine hosts the round through
//! [`PhysicsWorld`], reading body state and issuing a handful of mutations.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::Material;

/// Opaque identity of a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// What a body is, as far as the game rules care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyTag {
    /// The floor the fruit stack on
    Ground,
    /// Side walls
    Boundary,
    /// A mergeable object of the given tier
    Fruit(u8),
    /// Cosmetic merge burst
    Particle,
}

impl BodyTag {
    pub fn tier(&self) -> Option<u8> {
        match self {
            BodyTag::Fruit(tier) => Some(*tier),
            _ => None,
        }
    }
}

/// Collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Circle { radius: f32 },
    /// Axis-aligned box (boundaries only)
    Rect { half_extents: Vec2 },
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub pos: Vec2,
    pub shape: BodyShape,
    pub is_static: bool,
    /// Sensors report nothing and push nothing
    pub is_sensor: bool,
    pub material: Material,
    pub tag: BodyTag,
}

impl BodyDesc {
    pub fn circle(pos: Vec2, radius: f32, material: Material, tag: BodyTag) -> Self {
        Self {
            pos,
            shape: BodyShape::Circle { radius },
            is_static: false,
            is_sensor: false,
            material,
            tag,
        }
    }

    pub fn boundary(center: Vec2, size: Vec2, friction: f32, tag: BodyTag) -> Self {
        Self {
            pos: center,
            shape: BodyShape::Rect {
                half_extents: size / 2.0,
            },
            is_static: true,
            is_sensor: false,
            material: Material {
                restitution: 0.0,
                friction,
                air_drag: 0.0,
                density: 0.0,
            },
            tag,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }
}

/// Read-only view of a body after the last step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub handle: BodyHandle,
    pub pos: Vec2,
    /// Velocity in field units per tick
    pub vel: Vec2,
    pub angle: f32,
    pub angular_vel: f32,
    pub shape: BodyShape,
    pub is_static: bool,
    pub tag: BodyTag,
}

impl BodySnapshot {
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Current circle radius (zero for boxes)
    pub fn circle_radius(&self) -> f32 {
        match self.shape {
            BodyShape::Circle { radius } => radius,
            BodyShape::Rect { .. } => 0.0,
        }
    }
}

/// Two bodies that started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl ContactPair {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self { a, b }
    }

    /// Order-independent identity of the pair
    pub fn key(&self) -> (BodyHandle, BodyHandle) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// Capabilities the rules layer needs from a 2D physics engine.
///
/// Mutators on a handle that is no longer in the world are no-ops.
pub trait PhysicsWorld {
    /// Create a body and add it to the world
    fn insert(&mut self, desc: BodyDesc) -> BodyHandle;
    fn remove(&mut self, handle: BodyHandle);
    /// All bodies, ascending by handle
    fn bodies(&self) -> Vec<BodyHandle>;
    fn body(&self, handle: BodyHandle) -> Option<BodySnapshot>;

    fn set_position(&mut self, handle: BodyHandle, pos: Vec2);
    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2);
    fn set_angle(&mut self, handle: BodyHandle, angle: f32);
    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_vel: f32);
    fn set_static(&mut self, handle: BodyHandle, is_static: bool);
    /// Uniformly scale a circle's radius by `factor`
    fn rescale(&mut self, handle: BodyHandle, factor: f32);

    /// Advance one tick and return pairs that started touching
    fn step(&mut self, dt: f32) -> Vec<ContactPair>;

    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    /// Remove bodies, optionally keeping static ones
    fn clear(&mut self, keep_static: bool);

    /// Snapshots of every body, ascending by handle
    fn snapshots(&self) -> Vec<BodySnapshot> {
        self.bodies()
            .into_iter()
            .filter_map(|h| self.body(h))
            .collect()
    }
}
