//! Error taxonomy shared by the runtime and its collaborators.

use thiserror::Error;

/// A named resource was requested that was never registered.
///
/// These always indicate a programming or configuration mistake, so they are
/// returned to the caller rather than recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("animation not found: \"{0}\"")]
    AnimationNotFound(String),
    #[error("asset not found: \"{0}\"")]
    AssetNotFound(String),
    #[error("audio not found: \"{0}\"")]
    AudioNotFound(String),
}

/// A value handed to a constructor violates its documented precondition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("animation must have at least one frame")]
    EmptyAnimation,
    #[error("animation fps must be positive, got {0}")]
    InvalidFps(f32),
    #[error("body mass must be positive, got {0}")]
    InvalidMass(f32),
    #[error("camera zoom must be positive, got {0}")]
    InvalidZoom(f32),
}
