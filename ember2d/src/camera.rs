//! Camera with frame-rate independent smoothing toward a followed target.

use std::{cell::Cell, rc::Rc};

use crate::error::ConfigError;
use crate::math::Vec2;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::surface::Surface;

/// Something the camera can track. Returning `None` leaves the camera where
/// it is for this frame.
pub trait CameraTarget {
    fn focus(&self, physics: &PhysicsWorld) -> Option<Vec2>;
}

impl CameraTarget for Vec2 {
    fn focus(&self, _physics: &PhysicsWorld) -> Option<Vec2> {
        Some(*self)
    }
}

/// Follow a registered physics body. Yields nothing once the body is removed.
impl CameraTarget for BodyHandle {
    fn focus(&self, physics: &PhysicsWorld) -> Option<Vec2> {
        physics.get(*self).map(|body| body.position)
    }
}

/// A point shared with the entity that moves it.
///
/// The entity keeps one clone and writes its position every update; the
/// camera reads the other.
#[derive(Clone, Debug, Default)]
pub struct FocusPoint(Rc<Cell<Vec2>>);

impl FocusPoint {
    pub fn new(position: Vec2) -> Self {
        Self(Rc::new(Cell::new(position)))
    }

    pub fn set(&self, position: Vec2) {
        self.0.set(position);
    }

    pub fn get(&self) -> Vec2 {
        self.0.get()
    }
}

impl CameraTarget for FocusPoint {
    fn focus(&self, _physics: &PhysicsWorld) -> Option<Vec2> {
        Some(self.get())
    }
}

/// 2D camera. `position` is the world point drawn at the centre of the surface.
pub struct Camera {
    pub position: Vec2,
    zoom: f32,
    lerp: f32,
    target: Option<Box<dyn CameraTarget>>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("position", &self.position)
            .field("zoom", &self.zoom)
            .field("lerp", &self.lerp)
            .field("following", &self.target.is_some())
            .finish()
    }
}

impl Camera {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            zoom: 1.0,
            lerp: 1.0,
            target: None,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor. Must be positive and finite.
    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), ConfigError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ConfigError::InvalidZoom(zoom));
        }
        self.zoom = zoom;
        Ok(())
    }

    pub fn lerp(&self) -> f32 {
        self.lerp
    }

    /// Smoothing per 1/60 s: 1 snaps to the target, 0 never moves.
    pub fn set_lerp(&mut self, lerp: f32) {
        self.lerp = lerp.clamp(0.0, 1.0);
    }

    pub fn follow(&mut self, target: impl CameraTarget + 'static) {
        self.target = Some(Box::new(target));
    }

    pub fn unfollow(&mut self) {
        self.target = None;
    }

    pub fn is_following(&self) -> bool {
        self.target.is_some()
    }

    /// Move toward the followed target, if any.
    pub fn update(&mut self, dt: f32, physics: &PhysicsWorld) {
        let Some(focus) = self.target.as_ref().and_then(|t| t.focus(physics)) else {
            return;
        };
        self.approach(focus, dt);
    }

    /// Close `alpha = 1 - (1 - lerp)^(dt * 60)` of the remaining distance on each axis.
    ///
    /// `lerp = 1` lands exactly on `focus` for any `dt`, including 0.
    pub fn approach(&mut self, focus: Vec2, dt: f32) {
        if self.lerp >= 1.0 {
            self.position = focus;
            return;
        }
        let alpha = 1.0 - (1.0 - self.lerp).powf(dt * 60.0);
        self.position.x += (focus.x - self.position.x) * alpha;
        self.position.y += (focus.y - self.position.y) * alpha;
    }

    /// Push the world-to-screen transform onto `surface`. Callers wrap this in
    /// `save`/`restore`.
    pub fn apply(&self, surface: &mut dyn Surface, width: f32, height: f32) {
        let (dx, dy) = self.offset(width, height);
        surface.translate(dx, dy);
        surface.scale(self.zoom, self.zoom);
    }

    pub fn world_to_screen(&self, world: Vec2, width: f32, height: f32) -> Vec2 {
        let (dx, dy) = self.offset(width, height);
        Vec2::new(world.x * self.zoom + dx, world.y * self.zoom + dy)
    }

    pub fn screen_to_world(&self, screen: Vec2, width: f32, height: f32) -> Vec2 {
        let (dx, dy) = self.offset(width, height);
        Vec2::new((screen.x - dx) / self.zoom, (screen.y - dy) / self.zoom)
    }

    /// Whole-pixel translation so sprites do not shimmer between pixels.
    fn offset(&self, width: f32, height: f32) -> (f32, f32) {
        (
            (width / 2.0 - self.position.x * self.zoom).round(),
            (height / 2.0 - self.position.y * self.zoom).round(),
        )
    }
}
