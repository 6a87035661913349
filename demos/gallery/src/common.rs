use anyhow::Result;
use ember2d::{rgb, Engine, EngineContext, KeyCode, Surface, UiElement};

use crate::menu::Menu;

pub const HINT_SIZE: f32 = 14.0;

/// Put the camera at the surface centre so world and screen pixels line up.
pub fn screen_space_camera(engine: &mut Engine) {
    let ctx = engine.context_mut();
    let (w, h) = ctx.surface_size();
    ctx.camera.unfollow();
    ctx.camera.position = (w as f32 / 2.0, h as f32 / 2.0).into();
}

/// "Esc - back" hint; returns to the menu on Escape.
pub struct BackHint;

impl UiElement for BackHint {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        if ctx.input.is_pressed(KeyCode::Escape) {
            ctx.commands.load_scene(Menu);
        }
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        let (_, h) = surface.size();
        surface.fill_text("Esc - back", 12.0, h as f32 - 12.0, HINT_SIZE, rgb(0x888888));
    }
}
