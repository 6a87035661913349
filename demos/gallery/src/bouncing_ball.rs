use anyhow::Result;
use ember2d::{
    rgb, BodyHandle, Bounds, Engine, EngineContext, Entity, KeyCode, PhysicsBody, Scene, Surface,
    UiElement, Vec2, Waveform,
};

use crate::common::{screen_space_camera, BackHint, HINT_SIZE};

const RADIUS: f32 = 24.0;
const RESTITUTION: f32 = 0.65;
const LAUNCH_IMPULSE: f32 = 700.0;
/// Impacts slower than this bounce silently.
const AUDIBLE_IMPACT: f32 = 120.0;

fn floor_y(height: u32) -> f32 {
    height as f32 - 40.0
}

/// A ball under gravity that bounces off the floor; Space launches it.
#[derive(Default)]
pub struct BouncingBall {
    body: Option<BodyHandle>,
}

impl Scene for BouncingBall {
    fn name(&self) -> &str {
        "bouncing-ball"
    }

    fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
        screen_space_camera(engine);
        let ctx = engine.context_mut();
        let (w, h) = ctx.surface_size();
        let body = ctx
            .physics
            .add(PhysicsBody::at(w as f32 / 2.0, 100.0).with_restitution(RESTITUTION));
        self.body = Some(body);

        engine.add(Ball::new(body, floor_y(h)));
        engine.add_ui(Floor);
        engine.add_ui(BackHint);
        Ok(())
    }

    fn on_exit(&mut self, engine: &mut Engine) -> Result<()> {
        if let Some(body) = self.body.take() {
            engine.context_mut().physics.remove(body);
        }
        Ok(())
    }
}

struct Ball {
    body: BodyHandle,
    floor: f32,
    position: Vec2,
}

impl Ball {
    fn new(body: BodyHandle, floor: f32) -> Self {
        Self {
            body,
            floor,
            position: Vec2::ZERO,
        }
    }
}

impl Entity for Ball {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        let Some(body) = ctx.physics.get_mut(self.body) else {
            return Ok(());
        };

        if body.position.y >= self.floor {
            let impact = body.velocity.y;
            body.position.y = self.floor;
            body.velocity.y = -impact.abs() * body.restitution;
            if impact > AUDIBLE_IMPACT {
                let volume = (impact / 1500.0).min(0.4);
                ctx.audio.tone(180.0, 0.12, volume, Waveform::Sine);
            }
        }

        if ctx.input.is_pressed(KeyCode::Space) {
            body.position.y = self.floor;
            body.velocity.y = 0.0;
            body.apply_impulse(0.0, -LAUNCH_IMPULSE);
        }

        self.position = body.position;
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        surface.fill_circle(self.position.x, self.position.y, RADIUS, rgb(0xff7043));
    }

    fn name(&self) -> &str {
        "ball"
    }
}

/// Floor line under the resting ball, plus the launch hint.
struct Floor;

impl UiElement for Floor {
    fn render(&self, surface: &mut dyn Surface) {
        let (w, h) = surface.size();
        let y = floor_y(h) + RADIUS;
        surface.fill_rect(Bounds::new(0.0, y, w as f32, 2.0), rgb(0x555555));
        surface.fill_text("Space - launch", 16.0, 24.0, HINT_SIZE, rgb(0xcccccc));
    }
}
