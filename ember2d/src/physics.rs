//! Point-mass physics: bodies accumulate forces and impulses, the world
//! integrates them once per tick.
//!
//! Integration is semi-implicit Euler in a fixed order per body:
//! gravity, accumulated force, drag, then position. Drag is a linear damping
//! approximation (`v *= max(0, 1 - drag * dt)`), not an exact exponential
//! decay. Collision response is not handled here; `restitution` is carried
//! for entity code that reacts to collisions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Vec2;

/// Default gravity in px/s², pointing down the screen.
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 980.0);

/// A point mass with velocity and a per-step force accumulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub position: Vec2,
    pub velocity: Vec2,
    mass: f32,
    /// 0 = weightless, 1 = normal, negative floats upward.
    pub gravity_scale: f32,
    /// Velocity damping per second (0 = none).
    pub drag: f32,
    /// Bounciness for entity-level collision reactions (0 = none, 1 = elastic).
    pub restitution: f32,
    #[serde(skip)]
    force: Vec2,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            mass: 1.0,
            gravity_scale: 1.0,
            drag: 0.0,
            restitution: 0.0,
            force: Vec2::ZERO,
        }
    }
}

impl PhysicsBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Set the mass. Rejects zero, negative and NaN masses.
    pub fn set_mass(&mut self, mass: f32) -> Result<(), ConfigError> {
        if mass.is_nan() || mass <= 0.0 {
            return Err(ConfigError::InvalidMass(mass));
        }
        self.mass = mass;
        Ok(())
    }

    /// Builder form of [`PhysicsBody::set_mass`].
    pub fn with_mass(mut self, mass: f32) -> Result<Self, ConfigError> {
        self.set_mass(mass)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    #[must_use]
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag.max(0.0);
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Add a continuous force for this step.
    ///
    /// The accumulator is cleared after every step, so sustained forces
    /// (thrust, wind) must be re-applied each frame.
    pub fn apply_force(&mut self, fx: f32, fy: f32) {
        self.force.x += fx;
        self.force.y += fy;
    }

    /// Change velocity immediately by `impulse / mass`.
    pub fn apply_impulse(&mut self, ix: f32, iy: f32) {
        self.velocity.x += ix / self.mass;
        self.velocity.y += iy / self.mass;
    }

    /// Change velocity immediately, ignoring mass.
    pub fn apply_acceleration(&mut self, ax: f32, ay: f32) {
        self.velocity.x += ax;
        self.velocity.y += ay;
    }

    /// Force accumulated since the last step.
    pub fn accumulated_force(&self) -> Vec2 {
        self.force
    }

    /// Advance this body by `dt` seconds under `gravity`.
    pub fn step(&mut self, dt: f32, gravity: Vec2) {
        self.velocity += gravity * (self.gravity_scale * dt);
        self.velocity += self.force / self.mass * dt;

        if self.drag > 0.0 {
            let factor = (1.0 - self.drag * dt).max(0.0);
            self.velocity *= factor;
        }

        self.position += self.velocity * dt;
        self.force = Vec2::ZERO;
    }
}

/// Stable identifier of a body registered in a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(u32);

impl BodyHandle {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Global gravity plus the set of bodies currently being simulated.
#[derive(Debug)]
pub struct PhysicsWorld {
    gravity: Vec2,
    bodies: HashMap<BodyHandle, PhysicsBody>,
    next_id: u32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }

    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Register a body and return its handle.
    pub fn add(&mut self, body: PhysicsBody) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.bodies.insert(handle, body);
        handle
    }

    /// Stop simulating a body and hand it back to the caller.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<PhysicsBody> {
        self.bodies.remove(&handle)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&PhysicsBody> {
        self.bodies.get(&handle)
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut PhysicsBody> {
        self.bodies.get_mut(&handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Drop every registered body.
    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    /// Advance every registered body by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            body.step(dt, gravity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn weightless() -> PhysicsBody {
        PhysicsBody::new().with_gravity_scale(0.0)
    }

    #[test]
    fn test_forces_accumulate_then_clear() {
        let mut body = weightless().with_mass(2.0).unwrap();
        body.apply_force(10.0, 0.0);
        body.apply_force(6.0, -4.0);
        body.apply_force(-2.0, 0.0);
        assert_eq!(body.accumulated_force(), Vec2::new(14.0, -4.0));

        body.step(0.5, DEFAULT_GRAVITY);
        // dv = F / m * dt
        assert!(approx_eq(body.velocity.x, 14.0 / 2.0 * 0.5));
        assert!(approx_eq(body.velocity.y, -4.0 / 2.0 * 0.5));
        assert_eq!(body.accumulated_force(), Vec2::ZERO);

        // Not re-applied, so no further change.
        let v = body.velocity;
        body.step(0.5, DEFAULT_GRAVITY);
        assert_eq!(body.velocity, v);
    }

    #[test]
    fn test_pure_inertia() {
        let mut body = weightless();
        body.velocity = Vec2::new(3.0, -7.0);
        for _ in 0..1000 {
            body.step(1.0 / 60.0, DEFAULT_GRAVITY);
        }
        assert_eq!(body.velocity, Vec2::new(3.0, -7.0));
    }

    #[test]
    fn test_gravity_scaled() {
        let mut body = PhysicsBody::new().with_gravity_scale(0.5);
        body.step(0.1, Vec2::new(0.0, 100.0));
        assert!(approx_eq(body.velocity.y, 5.0));
        // Position integrates the already-updated velocity.
        assert!(approx_eq(body.position.y, 0.5));
    }

    #[test]
    fn test_impulse_divides_by_mass() {
        let mut body = weightless().with_mass(4.0).unwrap();
        body.apply_impulse(0.0, -700.0);
        assert!(approx_eq(body.velocity.y, -175.0));
    }

    #[test]
    fn test_acceleration_ignores_mass() {
        let mut body = weightless().with_mass(4.0).unwrap();
        body.apply_acceleration(2.0, 3.0);
        assert_eq!(body.velocity, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_drag_is_linear_and_clamped() {
        let mut body = weightless().with_drag(0.5);
        body.velocity = Vec2::new(10.0, 0.0);
        body.step(0.2, DEFAULT_GRAVITY);
        assert!(approx_eq(body.velocity.x, 9.0));

        let mut heavy_drag = weightless().with_drag(10.0);
        heavy_drag.velocity = Vec2::new(10.0, 10.0);
        heavy_drag.step(1.0, DEFAULT_GRAVITY);
        assert_eq!(heavy_drag.velocity, Vec2::ZERO);
        assert_eq!(heavy_drag.position, Vec2::ZERO);
    }

    #[test]
    fn test_drag_applies_after_force() {
        let mut body = weightless().with_drag(0.5);
        body.apply_force(10.0, 0.0);
        body.step(1.0, DEFAULT_GRAVITY);
        // (0 + 10 / 1 * 1) * (1 - 0.5)
        assert!(approx_eq(body.velocity.x, 5.0));
        assert!(approx_eq(body.position.x, 5.0));
    }

    #[test]
    fn test_invalid_mass_rejected() {
        let mut body = PhysicsBody::new();
        assert_eq!(body.set_mass(0.0), Err(ConfigError::InvalidMass(0.0)));
        assert!(body.set_mass(-1.0).is_err());
        assert!(body.set_mass(f32::NAN).is_err());
        assert_eq!(body.mass(), 1.0);
    }

    #[test]
    fn test_world_membership() {
        let mut world = PhysicsWorld::new();
        let a = world.add(PhysicsBody::at(1.0, 2.0));
        let b = world.add(PhysicsBody::new());
        assert_ne!(a, b);
        assert_eq!(world.len(), 2);

        let body = world.remove(a).expect("body registered");
        assert_eq!(body.position, Vec2::new(1.0, 2.0));
        assert!(!world.contains(a));
        assert!(world.remove(a).is_none());
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_world_steps_only_registered_bodies() {
        let mut world = PhysicsWorld::with_gravity(Vec2::new(0.0, 10.0));
        let handle = world.add(PhysicsBody::new());
        let removed = world.add(PhysicsBody::new());
        let detached = world.remove(removed).unwrap();
        world.step(1.0);

        assert!(approx_eq(world.get(handle).unwrap().velocity.y, 10.0));
        assert_eq!(detached.velocity, Vec2::ZERO);

        world.get_mut(handle).unwrap().apply_force(0.0, -10.0);
        world.set_gravity(Vec2::ZERO);
        world.step(1.0);
        assert!(approx_eq(world.get(handle).unwrap().velocity.y, 0.0));
    }
}
