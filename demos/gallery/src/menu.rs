use anyhow::Result;
use ember2d::{rgb, Bounds, Engine, EngineContext, KeyCode, Scene, Surface, UiElement};

use crate::bouncing_ball::BouncingBall;
use crate::common::screen_space_camera;
use crate::player::PlayerDemo;

const DIGITS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

struct Demo {
    title: &'static str,
    build: fn() -> Box<dyn Scene>,
}

const DEMOS: &[Demo] = &[
    Demo {
        title: "Player movement",
        build: player_demo,
    },
    Demo {
        title: "Bouncing ball",
        build: bouncing_ball,
    },
];

fn player_demo() -> Box<dyn Scene> {
    Box::new(PlayerDemo::default())
}

fn bouncing_ball() -> Box<dyn Scene> {
    Box::new(BouncingBall::default())
}

/// Lists the demos; a digit key launches one.
pub struct Menu;

impl Scene for Menu {
    fn name(&self) -> &str {
        "menu"
    }

    fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
        screen_space_camera(engine);
        engine.add_ui(MenuList);
        Ok(())
    }
}

struct MenuList;

impl UiElement for MenuList {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        let chosen = DIGITS
            .iter()
            .zip(DEMOS)
            .find(|(key, _)| ctx.input.is_pressed(**key));
        if let Some((_, demo)) = chosen {
            log::info!("launching \"{}\"", demo.title);
            ctx.commands.load_scene_boxed((demo.build)());
        }
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        let (w, h) = surface.size();
        let (w, h) = (w as f32, h as f32);
        surface.fill_rect(Bounds::new(0.0, 0.0, w, h), rgb(0x0f0f1a));
        surface.fill_text("demos", w / 2.0 - 50.0, 80.0, 36.0, rgb(0xffffff));

        for (i, demo) in DEMOS.iter().enumerate() {
            let y = 140.0 + i as f32 * 44.0;
            let line = format!("[{}]  {}", i + 1, demo.title);
            surface.fill_text(&line, w / 2.0 - 120.0, y, 22.0, rgb(0xcccccc));
        }

        surface.fill_text("Press a number to start", 12.0, h - 12.0, 14.0, rgb(0x888888));
    }
}
