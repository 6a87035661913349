//! Spritesheet animation playback.
//!
//! An [`Animator`] holds a set of named [`AnimationConfig`]s and plays one at
//! a time, yielding the spritesheet cell to draw each frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LookupError};

/// A single spritesheet cell (0-indexed column and row).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub col: u32,
    pub row: u32,
}

impl AnimationFrame {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

fn default_looping() -> bool {
    true
}

/// A timed sequence of spritesheet cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub frames: Vec<AnimationFrame>,
    pub fps: f32,
    #[serde(default = "default_looping", alias = "loop")]
    pub looping: bool,
}

impl AnimationConfig {
    /// Create a looping animation. Fails if `frames` is empty or `fps` is not positive.
    pub fn new(frames: Vec<AnimationFrame>, fps: f32) -> Result<Self, ConfigError> {
        let config = Self {
            frames,
            fps,
            looping: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build an animation from consecutive cells of one spritesheet row.
    pub fn from_row(row: u32, cols: std::ops::Range<u32>, fps: f32) -> Result<Self, ConfigError> {
        Self::new(cols.map(|col| AnimationFrame::new(col, row)).collect(), fps)
    }

    #[must_use]
    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames.is_empty() {
            return Err(ConfigError::EmptyAnimation);
        }
        if self.fps.is_nan() || self.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        Ok(())
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.fps
    }
}

/// Per-entity animation state machine.
///
/// Before the first [`Animator::play`] there is no current animation and
/// [`Animator::frame`] yields the `{0, 0}` cell.
#[derive(Clone, Debug, Default)]
pub struct Animator {
    animations: HashMap<String, AnimationConfig>,
    current: Option<String>,
    frame_index: usize,
    elapsed: f32,
    done: bool,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{ "name": { "frames": [...], "fps": 8, "loop": false } }` map.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let animations: HashMap<String, AnimationConfig> = serde_json::from_str(json)?;
        for (name, config) in &animations {
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("animation \"{name}\": {e}"))?;
        }
        Ok(Self {
            animations,
            ..Self::default()
        })
    }

    /// Register (or replace) a named animation.
    pub fn add(&mut self, name: impl Into<String>, config: AnimationConfig) -> &mut Self {
        self.animations.insert(name.into(), config);
        self
    }

    /// Switch to `name`, restarting from its first frame.
    ///
    /// Playing the animation that is already current does nothing, so it is
    /// safe to call every frame.
    pub fn play(&mut self, name: &str) -> Result<(), LookupError> {
        if self.current.as_deref() == Some(name) {
            return Ok(());
        }
        if !self.animations.contains_key(name) {
            return Err(LookupError::AnimationNotFound(name.to_string()));
        }
        self.current = Some(name.to_string());
        self.frame_index = 0;
        self.elapsed = 0.0;
        self.done = false;
        Ok(())
    }

    pub fn update(&mut self, dt: f32) {
        if self.done {
            return;
        }
        let Some(anim) = self.current.as_ref().and_then(|n| self.animations.get(n)) else {
            return;
        };

        self.elapsed += dt;
        let frame_duration = anim.frame_duration();

        while self.elapsed >= frame_duration {
            self.elapsed -= frame_duration;
            self.frame_index += 1;

            if self.frame_index >= anim.frames.len() {
                if anim.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = anim.frames.len() - 1;
                    self.done = true;
                    break;
                }
            }
        }
    }

    /// The cell to draw this frame.
    pub fn frame(&self) -> AnimationFrame {
        self.current
            .as_ref()
            .and_then(|n| self.animations.get(n))
            .and_then(|anim| anim.frames.get(self.frame_index))
            .copied()
            .unwrap_or_default()
    }

    /// Name of the current animation, or `""` before anything has played.
    pub fn name(&self) -> &str {
        self.current.as_deref().unwrap_or("")
    }

    /// True once a non-looping animation has reached its last frame.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn has(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }
}
