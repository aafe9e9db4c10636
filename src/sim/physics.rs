//! Rigid-body world on rapier2d
//!
//! Implements [`PhysicsWorld`] over a rapier pipeline with one rigid body
//! and one collider per game body. Collision-start pairs come from rapier's
//! `CollisionEvent::Started`, collected through a [`ChannelEventCollector`].
//!
//! The rules layer measures speeds in field units per tick while rapier
//! integrates per second, so velocities and gravity cross the boundary
//! scaled by [`SIM_DT`].

use std::collections::BTreeMap;

use glam::Vec2;
use rapier2d::crossbeam::channel::{Receiver, Sender, unbounded};
use rapier2d::prelude::*;

use super::world::{BodyDesc, BodyHandle, BodyShape, BodySnapshot, BodyTag, ContactPair, PhysicsWorld};
use crate::consts::SIM_DT;

/// Downward acceleration in field units per tick²
pub const DEFAULT_GRAVITY: f32 = 0.28;

/// Rapier damping coefficient that removes `air_drag` of a body's velocity
/// every tick.
fn damping_per_second(air_drag: f32) -> f32 {
    let keep = (1.0 - air_drag).clamp(f32::EPSILON, 1.0);
    (1.0 / keep - 1.0) / SIM_DT
}

/// Rapier-side identity and game-side description of one body
struct Slot {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    shape: BodyShape,
    tag: BodyTag,
}

/// [`PhysicsWorld`] backed by rapier2d
pub struct RapierWorld {
    slots: BTreeMap<BodyHandle, Slot>,
    next_id: u32,
    running: bool,
    /// Downward acceleration in field units per tick²
    pub gravity: f32,

    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,

    collision_send: Sender<CollisionEvent>,
    collision_recv: Receiver<CollisionEvent>,
    force_send: Sender<ContactForceEvent>,
    force_recv: Receiver<ContactForceEvent>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (force_send, force_recv) = unbounded();
        Self {
            slots: BTreeMap::new(),
            next_id: 1,
            running: false,
            gravity: DEFAULT_GRAVITY,
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            collision_send,
            collision_recv,
            force_send,
            force_recv,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn rigid_body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let slot = self.slots.get(&handle)?;
        self.bodies.get_mut(slot.body)
    }

    /// Game body owning a rapier collider
    fn owner(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let handle = BodyHandle(self.colliders.get(collider)?.user_data as u32);
        self.slots.contains_key(&handle).then_some(handle)
    }
}

impl PhysicsWorld for RapierWorld {
    fn insert(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let damping = damping_per_second(desc.material.air_drag);
        let builder = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let body = self.bodies.insert(
            builder
                .translation(vector![desc.pos.x, desc.pos.y])
                .linear_damping(damping)
                .angular_damping(damping)
                .build(),
        );

        let collider = match desc.shape {
            BodyShape::Circle { radius } => ColliderBuilder::ball(radius),
            BodyShape::Rect { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            }
        }
        .restitution(desc.material.restitution)
        .friction(desc.material.friction)
        .density(desc.material.density)
        .sensor(desc.is_sensor)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .user_data(u128::from(handle.0))
        .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        self.slots.insert(
            handle,
            Slot {
                body,
                collider,
                shape: desc.shape,
                tag: desc.tag,
            },
        );
        handle
    }

    fn remove(&mut self, handle: BodyHandle) {
        if let Some(slot) = self.slots.remove(&handle) {
            self.bodies.remove(
                slot.body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn bodies(&self) -> Vec<BodyHandle> {
        self.slots.keys().copied().collect()
    }

    fn body(&self, handle: BodyHandle) -> Option<BodySnapshot> {
        let slot = self.slots.get(&handle)?;
        let rb = self.bodies.get(slot.body)?;
        let pos = rb.translation();
        let vel = rb.linvel();
        Some(BodySnapshot {
            handle,
            pos: Vec2::new(pos.x, pos.y),
            vel: Vec2::new(vel.x, vel.y) * SIM_DT,
            angle: rb.rotation().angle(),
            angular_vel: rb.angvel() * SIM_DT,
            shape: slot.shape,
            is_static: rb.is_fixed(),
            tag: slot.tag,
        })
    }

    fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_translation(vector![pos.x, pos.y], true);
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_linvel(vector![vel.x / SIM_DT, vel.y / SIM_DT], true);
        }
    }

    fn set_angle(&mut self, handle: BodyHandle, angle: f32) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            let position = Isometry::new(*rb.translation(), angle);
            rb.set_position(position, true);
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_vel: f32) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_angvel(angular_vel / SIM_DT, true);
        }
    }

    fn set_static(&mut self, handle: BodyHandle, is_static: bool) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            if is_static {
                rb.set_body_type(RigidBodyType::Fixed, false);
                rb.set_linvel(vector![0.0, 0.0], false);
                rb.set_angvel(0.0, false);
            } else {
                rb.set_body_type(RigidBodyType::Dynamic, true);
            }
        }
    }

    fn rescale(&mut self, handle: BodyHandle, factor: f32) {
        let Some(slot) = self.slots.get_mut(&handle) else {
            return;
        };
        if let BodyShape::Circle { radius } = &mut slot.shape {
            *radius *= factor;
            if let Some(collider) = self.colliders.get_mut(slot.collider) {
                collider.set_shape(SharedShape::ball(*radius));
            }
            if let Some(rb) = self.bodies.get_mut(slot.body) {
                rb.wake_up(true);
            }
        }
    }

    fn step(&mut self, dt: f32) -> Vec<ContactPair> {
        if !self.running {
            return Vec::new();
        }
        self.params.dt = dt;
        let gravity = vector![0.0, self.gravity / (SIM_DT * SIM_DT)];
        let events =
            ChannelEventCollector::new(self.collision_send.clone(), self.force_send.clone());

        self.pipeline.step(
            &gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &events,
        );

        while self.force_recv.try_recv().is_ok() {}

        let mut started = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            let CollisionEvent::Started(c1, c2, flags) = event else {
                continue;
            };
            if flags.contains(CollisionEventFlags::SENSOR) {
                continue;
            }
            if let (Some(a), Some(b)) = (self.owner(c1), self.owner(c2)) {
                started.push(ContactPair::new(a, b));
            }
        }
        started
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn clear(&mut self, keep_static: bool) {
        let doomed: Vec<BodyHandle> = self
            .slots
            .iter()
            .filter(|(_, slot)| {
                !keep_static || !self.bodies.get(slot.body).is_some_and(|rb| rb.is_fixed())
            })
            .map(|(h, _)| *h)
            .collect();
        for handle in doomed {
            self.remove(handle);
        }
    }
}
