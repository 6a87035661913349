//! Ember2D - a minimal real-time 2D simulation runtime.
//!
//! A fixed-order frame loop (physics, camera, entity updates, collisions,
//! rendering, UI, input flush) composed with a single active scene.

pub mod animation;
pub mod assets;
pub mod audio;
pub mod camera;
pub mod canvas;
pub mod collision;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod input;
pub mod math;
pub mod physics;
pub mod present;
pub mod scene;
pub mod sprite;
pub mod surface;
pub mod time;

pub use crate::animation::{AnimationConfig, AnimationFrame, Animator};
pub use crate::assets::{AssetLoader, AssetProvider, ImageHandle};
pub use crate::audio::{AudioManager, AudioProvider, SilentAudio, Tone, Waveform};
pub use crate::camera::{Camera, CameraTarget, FocusPoint};
pub use crate::canvas::Canvas;
pub use crate::collision::Bounds;
pub use crate::config::EngineConfig;
pub use crate::engine::{Command, Commands, Engine, EngineContext};
pub use crate::entity::{Entity, EntityId, EntityRegistry, UiElement, UiId};
pub use crate::error::{ConfigError, LookupError};
pub use crate::input::InputState;
pub use crate::math::Vec2;
pub use crate::physics::{BodyHandle, PhysicsBody, PhysicsWorld, DEFAULT_GRAVITY};
pub use crate::scene::Scene;
pub use crate::sprite::Sprite;
pub use crate::surface::{rgb, Color, DrawCommand, HeadlessSurface, Surface};
pub use crate::time::{ManualClock, SystemClock, TimeSource};
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
