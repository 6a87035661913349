//! Single-slot scene lifecycle.
//!
//! At most one scene is active. Loading another scene exits the current one,
//! clears every entity and UI element, then enters the new one. There is no
//! scene stack.

use anyhow::Result;

use crate::engine::Engine;

/// A self-contained level or screen that populates the engine when entered.
///
/// # Example
///
/// ```rust,no_run
/// use anyhow::Result;
/// use ember2d::{Engine, Scene};
///
/// struct Title;
///
/// impl Scene for Title {
///     fn name(&self) -> &str {
///         "title"
///     }
///
///     fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
///         engine.context_mut().camera.position = (400.0, 300.0).into();
///         Ok(())
///     }
/// }
/// ```
pub trait Scene {
    fn name(&self) -> &str;

    /// Called after the previous scene's entities were cleared.
    fn on_enter(&mut self, _engine: &mut Engine) -> Result<()> {
        Ok(())
    }

    /// Called before this scene's entities are cleared.
    fn on_exit(&mut self, _engine: &mut Engine) -> Result<()> {
        Ok(())
    }
}

/// Holds the active scene between transitions.
#[derive(Default)]
pub(crate) struct SceneSlot {
    active: Option<Box<dyn Scene>>,
}

impl SceneSlot {
    pub(crate) fn take(&mut self) -> Option<Box<dyn Scene>> {
        self.active.take()
    }

    pub(crate) fn set(&mut self, scene: Box<dyn Scene>) {
        self.active = Some(scene);
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.active.as_deref().map(|s| s.name())
    }
}
