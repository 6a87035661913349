use anyhow::Result;
use ember2d::{
    rgb, AnimationConfig, Animator, Bounds, Color, Engine, EngineContext, Entity, ImageHandle,
    KeyCode, Scene, Sprite, Surface, UiElement, Vec2, Waveform,
};
use image::{Rgba, RgbaImage};

use crate::common::{screen_space_camera, BackHint, HINT_SIZE};

pub const SHEET_KEY: &str = "player";

const SPEED: f32 = 250.0;
const SIZE: f32 = 60.0;
const CRATE_SIZE: f32 = 48.0;

/// Two-frame walk cycle: a solid square, then the same square with a
/// lighter band across the middle.
pub fn generate_sheet() -> ImageHandle {
    let size = SIZE as u32;
    let base = Rgba([0x4f, 0xc3, 0xf7, 0xff]);
    let band = Rgba([0xb3, 0xe5, 0xfc, 0xff]);
    let image = RgbaImage::from_fn(size * 2, size, |x, y| {
        if x >= size && (size / 3..size * 2 / 3).contains(&y) {
            band
        } else {
            base
        }
    });
    ImageHandle::from_rgba(image)
}

/// Arrow keys move a square around the screen; crates light up on contact
/// and change color when clicked.
#[derive(Default)]
pub struct PlayerDemo;

impl Scene for PlayerDemo {
    fn name(&self) -> &str {
        "player-demo"
    }

    fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
        screen_space_camera(engine);
        let (w, h) = engine.context().surface_size();
        let (w, h) = (w as f32, h as f32);

        let sheet = engine.context().assets.get(SHEET_KEY)?;
        engine.add(Player::new(
            Sprite::sheet(sheet, SIZE as u32, SIZE as u32),
            Vec2::new(w / 2.0 - SIZE / 2.0, h / 2.0 - SIZE / 2.0),
        )?);

        for (i, x) in [120.0, w - 120.0 - CRATE_SIZE].into_iter().enumerate() {
            for y in [120.0, h - 120.0 - CRATE_SIZE] {
                engine.add(Crate::new(Vec2::new(x, y), i));
            }
        }

        engine.add_ui(Controls);
        engine.add_ui(BackHint);
        Ok(())
    }
}

struct Player {
    position: Vec2,
    sprite: Sprite,
    animator: Animator,
}

impl Player {
    fn new(sprite: Sprite, position: Vec2) -> Result<Self> {
        let mut animator = Animator::new();
        animator
            .add("idle", AnimationConfig::from_row(0, 0..1, 1.0)?)
            .add("walk", AnimationConfig::from_row(0, 0..2, 8.0)?);
        animator.play("idle")?;
        Ok(Self {
            position,
            sprite,
            animator,
        })
    }
}

impl Entity for Player {
    fn update(&mut self, ctx: &mut EngineContext, dt: f32) -> Result<()> {
        let input = &ctx.input;
        let axis = |neg: KeyCode, pos: KeyCode| {
            (input.is_down(pos) as i32 - input.is_down(neg) as i32) as f32
        };
        let direction = Vec2::new(
            axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            axis(KeyCode::ArrowUp, KeyCode::ArrowDown),
        );

        let (w, h) = ctx.surface_size();
        let next = self.position + direction * (SPEED * dt);
        self.position = Vec2::new(
            next.x.clamp(0.0, w as f32 - SIZE),
            next.y.clamp(0.0, h as f32 - SIZE),
        );

        let moving = direction != Vec2::ZERO;
        self.animator.play(if moving { "walk" } else { "idle" })?;
        self.animator.update(dt);
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        self.sprite
            .draw(surface, self.position.x, self.position.y, self.animator.frame());
    }

    fn z_index(&self) -> i32 {
        1
    }

    fn collidable(&self) -> bool {
        true
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(self.position.x, self.position.y, SIZE, SIZE))
    }

    fn name(&self) -> &str {
        "player"
    }
}

const CRATE_COLORS: [u32; 3] = [0x8d6e63, 0x66bb6a, 0xffca28];

struct Crate {
    position: Vec2,
    color: usize,
    touching: bool,
}

impl Crate {
    fn new(position: Vec2, color: usize) -> Self {
        Self {
            position,
            color: color % CRATE_COLORS.len(),
            touching: false,
        }
    }

    fn fill(&self) -> Color {
        let mut color = rgb(CRATE_COLORS[self.color]);
        if self.touching {
            color[3] = 0.5;
        }
        color
    }
}

impl Entity for Crate {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        // Set again by the collision pass if the player is still on top.
        self.touching = false;
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        if let Some(bounds) = self.bounds() {
            surface.fill_rect(bounds, self.fill());
        }
    }

    fn collidable(&self) -> bool {
        true
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(
            self.position.x,
            self.position.y,
            CRATE_SIZE,
            CRATE_SIZE,
        ))
    }

    fn accepts_clicks(&self) -> bool {
        true
    }

    fn on_click(&mut self, ctx: &mut EngineContext) -> Result<()> {
        self.color = (self.color + 1) % CRATE_COLORS.len();
        ctx.audio.tone(660.0, 0.08, 0.2, Waveform::Square);
        Ok(())
    }

    fn on_collide(&mut self, other: &dyn Entity, _ctx: &mut EngineContext) -> Result<()> {
        if other.name() == "player" {
            self.touching = true;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "crate"
    }
}

struct Controls;

impl UiElement for Controls {
    fn render(&self, surface: &mut dyn Surface) {
        surface.fill_text(
            "Arrows - move, click a crate to recolor it",
            12.0,
            24.0,
            HINT_SIZE,
            rgb(0xcccccc),
        );
    }
}
