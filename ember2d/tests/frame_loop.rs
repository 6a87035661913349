//! Frame loop integration tests: phase order, draw order, collisions, clicks,
//! scene transitions, input edges and deferred commands.

use std::{cell::RefCell, rc::Rc};

use anyhow::{anyhow, Result};

use ember2d::{
    rgb, BodyHandle, Bounds, Color, DrawCommand, Engine, EngineConfig, EngineContext, Entity,
    EntityId, FocusPoint, HeadlessSurface, KeyCode, ManualClock, PhysicsBody, Scene, Surface,
    UiElement, Vec2,
};

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default().with_size(800, 600))
}

fn surface() -> HeadlessSurface {
    HeadlessSurface::new(800, 600)
}

/// Configurable test entity that logs what happens to it.
struct Probe {
    name: &'static str,
    log: Log,
    z: i32,
    bounds: Option<Bounds>,
    collidable: bool,
    clickable: bool,
    color: Color,
}

impl Probe {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            z: 0,
            bounds: None,
            collidable: false,
            clickable: false,
            color: rgb(0xffffff),
        }
    }

    fn z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    fn bounds(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bounds = Some(Bounds::new(x, y, w, h));
        self
    }

    fn collidable(mut self) -> Self {
        self.collidable = true;
        self
    }

    fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl Entity for Probe {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        self.log.borrow_mut().push(format!("update {}", self.name));
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        self.log.borrow_mut().push(format!("render {}", self.name));
        let rect = self.bounds.unwrap_or(Bounds::new(0.0, 0.0, 1.0, 1.0));
        surface.fill_rect(rect, self.color);
    }

    fn z_index(&self) -> i32 {
        self.z
    }

    fn collidable(&self) -> bool {
        self.collidable
    }

    fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn accepts_clicks(&self) -> bool {
        self.clickable
    }

    fn on_click(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        self.log.borrow_mut().push(format!("click {}", self.name));
        Ok(())
    }

    fn on_collide(&mut self, other: &dyn Entity, _ctx: &mut EngineContext) -> Result<()> {
        let other = other.name().to_string();
        self.log
            .borrow_mut()
            .push(format!("collide {} with {}", self.name, other));
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

struct Overlay {
    log: Log,
}

impl UiElement for Overlay {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        self.log.borrow_mut().push("ui update".into());
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface) {
        self.log.borrow_mut().push("ui render".into());
        surface.fill_rect(Bounds::new(0.0, 0.0, 10.0, 10.0), rgb(0x00ff00));
    }
}

#[test]
fn test_phases_run_in_fixed_order() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Probe::new("a", &log));
    engine.add(Probe::new("b", &log).z(-1));
    engine.add_ui(Overlay { log: log.clone() });

    let mut surface = surface();
    engine.step(1.0 / 60.0, &mut surface).unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "update a",
            "update b",
            "render b",
            "render a",
            "ui update",
            "ui render",
        ]
    );

    let commands = surface.commands();
    assert_eq!(commands[0], DrawCommand::Clear);
    assert_eq!(commands[1], DrawCommand::Save);
    assert!(matches!(commands[2], DrawCommand::Translate(..)));
    assert!(matches!(commands[3], DrawCommand::Scale(..)));
    assert_eq!(commands[6], DrawCommand::Restore);
    assert_eq!(surface.save_depth(), 0);
}

/// Reads its body's position during update.
struct BodyWatcher {
    body: BodyHandle,
    seen: Rc<RefCell<Vec<f32>>>,
}

impl Entity for BodyWatcher {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        let body = ctx
            .physics
            .get(self.body)
            .ok_or_else(|| anyhow!("body missing"))?;
        self.seen.borrow_mut().push(body.position.y);
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

#[test]
fn test_physics_steps_before_entity_update() {
    let mut engine = Engine::new(EngineConfig::default().with_gravity(Vec2::new(0.0, 10.0)));
    let body = engine.context_mut().physics.add(PhysicsBody::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    engine.add(BodyWatcher {
        body,
        seen: seen.clone(),
    });

    let mut surface = surface();
    engine.step(1.0, &mut surface).unwrap();
    engine.step(1.0, &mut surface).unwrap();

    // v = 10 then 20; p = 10 then 30.
    assert_eq!(*seen.borrow(), vec![10.0, 30.0]);
}

#[test]
fn test_world_renders_by_z_then_registration() {
    let log = new_log();
    let mut engine = engine();
    let colors = [rgb(0x000001), rgb(0x000002), rgb(0x000003), rgb(0x000004)];
    engine.add(Probe::new("a", &log).z(2).color(colors[0]));
    engine.add(Probe::new("b", &log).z(1).color(colors[1]));
    engine.add(Probe::new("c", &log).z(2).color(colors[2]));
    engine.add(Probe::new("d", &log).z(1).color(colors[3]));

    let mut surface = surface();
    engine.step(0.0, &mut surface).unwrap();

    let drawn: Vec<Color> = surface.rects().into_iter().map(|(_, c)| c).collect();
    assert_eq!(drawn, vec![colors[1], colors[3], colors[0], colors[2]]);
}

#[test]
fn test_overlapping_pair_collides_once_per_frame() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Probe::new("a", &log).bounds(0.0, 0.0, 10.0, 10.0).collidable());
    engine.add(Probe::new("b", &log).bounds(5.0, 5.0, 10.0, 10.0).collidable());
    engine.add(Probe::new("c", &log).bounds(10.0, 0.0, 10.0, 10.0).z(3));

    let mut surface = surface();
    for _ in 0..2 {
        engine.step(1.0 / 60.0, &mut surface).unwrap();
    }

    let collisions: Vec<String> = entries(&log)
        .into_iter()
        .filter(|e| e.starts_with("collide"))
        .collect();
    assert_eq!(
        collisions,
        vec![
            "collide a with b",
            "collide b with a",
            "collide a with b",
            "collide b with a",
        ]
    );
}

#[test]
fn test_touching_edges_do_not_collide() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Probe::new("a", &log).bounds(0.0, 0.0, 10.0, 10.0).collidable());
    engine.add(Probe::new("b", &log).bounds(10.0, 0.0, 10.0, 10.0).collidable());

    engine.step(1.0 / 60.0, &mut surface()).unwrap();
    assert!(entries(&log).iter().all(|e| !e.starts_with("collide")));
}

#[test]
fn test_click_goes_to_topmost_clickable_only() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Probe::new("low", &log).bounds(0.0, 0.0, 50.0, 50.0).clickable());
    engine.add(Probe::new("high", &log).bounds(20.0, 20.0, 50.0, 50.0).clickable().z(1));
    engine.add(Probe::new("decor", &log).bounds(0.0, 0.0, 100.0, 100.0).z(5));

    assert!(engine.click(30.0, 30.0).unwrap());
    assert!(engine.click(10.0, 10.0).unwrap());
    // Inclusive on the far edge.
    assert!(engine.click(70.0, 70.0).unwrap());
    assert!(!engine.click(90.0, 90.0).unwrap());

    assert_eq!(entries(&log), vec!["click high", "click low", "click high"]);
}

struct Level {
    name: &'static str,
    log: Log,
}

impl Scene for Level {
    fn name(&self) -> &str {
        self.name
    }

    fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
        self.log.borrow_mut().push(format!(
            "{} enter with {} entities and {} ui",
            self.name,
            engine.entities().len(),
            engine.ui_len()
        ));
        engine.add(Probe::new("prop", &self.log));
        engine.add_ui(Overlay {
            log: self.log.clone(),
        });
        Ok(())
    }

    fn on_exit(&mut self, engine: &mut Engine) -> Result<()> {
        self.log.borrow_mut().push(format!(
            "{} exit with {} entities",
            self.name,
            engine.entities().len()
        ));
        Ok(())
    }
}

#[test]
fn test_loading_scene_exits_clears_then_enters() {
    let log = new_log();
    let mut engine = engine();
    assert_eq!(engine.active_scene_name(), None);

    engine
        .load_scene(Level {
            name: "A",
            log: log.clone(),
        })
        .unwrap();
    assert_eq!(engine.active_scene_name(), Some("A"));

    engine
        .load_scene(Level {
            name: "B",
            log: log.clone(),
        })
        .unwrap();
    assert_eq!(engine.active_scene_name(), Some("B"));
    assert_eq!(engine.entities().len(), 1);
    assert_eq!(engine.ui_len(), 1);

    assert_eq!(
        entries(&log),
        vec![
            "A enter with 0 entities and 0 ui",
            "A exit with 1 entities",
            "B enter with 0 entities and 0 ui",
        ]
    );
}

/// Records the Space key's three states each frame.
struct KeyWatcher {
    frames: Rc<RefCell<Vec<(bool, bool, bool)>>>,
}

impl Entity for KeyWatcher {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        let input = &ctx.input;
        self.frames.borrow_mut().push((
            input.is_pressed(KeyCode::Space),
            input.is_down(KeyCode::Space),
            input.is_released(KeyCode::Space),
        ));
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

#[test]
fn test_key_edges_across_frames() {
    let frames = Rc::new(RefCell::new(Vec::new()));
    let mut engine = engine();
    engine.add(KeyWatcher {
        frames: frames.clone(),
    });
    let mut surface = surface();

    engine.context_mut().input.key_down(KeyCode::Space);
    engine.step(0.016, &mut surface).unwrap();
    // Auto-repeat while held.
    engine.context_mut().input.key_down(KeyCode::Space);
    engine.step(0.016, &mut surface).unwrap();
    engine.step(0.016, &mut surface).unwrap();
    engine.context_mut().input.key_up(KeyCode::Space);
    engine.step(0.016, &mut surface).unwrap();

    assert_eq!(
        *frames.borrow(),
        vec![
            (true, true, false),
            (false, true, false),
            (false, true, false),
            (false, false, true),
        ]
    );
}

#[test]
fn test_camera_follows_target_and_transforms_world() {
    let mut engine = engine();
    let target = FocusPoint::new(Vec2::new(100.0, 50.0));
    engine.context_mut().camera.follow(target.clone());

    let mut surface = surface();
    engine.step(1.0 / 60.0, &mut surface).unwrap();
    assert_eq!(engine.context().camera.position, Vec2::new(100.0, 50.0));
    assert_eq!(surface.commands()[2], DrawCommand::Translate(300.0, 250.0));

    engine.context_mut().camera.set_lerp(0.0);
    target.set(Vec2::new(500.0, 500.0));
    engine.step(1.0 / 60.0, &mut surface).unwrap();
    assert_eq!(engine.context().camera.position, Vec2::new(100.0, 50.0));
}

#[test]
fn test_tick_uses_injected_clock() {
    let clock = ManualClock::new(0.0);
    let mut engine = Engine::new(EngineConfig::default().with_gravity(Vec2::ZERO))
        .with_clock(clock.clone());
    let mut body = PhysicsBody::new();
    body.velocity = Vec2::new(100.0, 0.0);
    let handle = engine.context_mut().physics.add(body);

    let mut surface = surface();
    engine.start();
    clock.advance(0.5);
    engine.tick(&mut surface).unwrap();
    clock.advance(0.25);
    engine.tick(&mut surface).unwrap();

    let x = engine.context().physics.get(handle).unwrap().position.x;
    assert!((x - 75.0).abs() < 1e-4);
    assert_eq!(engine.context().frame_count(), 2);
    assert!((engine.context().elapsed_time() - 0.75).abs() < 1e-9);
}

/// Spawns a child on its first update and despawns itself on collision.
struct Spawner {
    log: Log,
    child: Option<EntityId>,
}

impl Entity for Spawner {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        self.log.borrow_mut().push("update spawner".into());
        if self.child.is_none() {
            let child = Probe::new("child", &self.log)
                .bounds(0.0, 0.0, 10.0, 10.0)
                .collidable();
            self.child = Some(ctx.commands.spawn(child));
        }
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {
        self.log.borrow_mut().push("render spawner".into());
    }

    fn collidable(&self) -> bool {
        true
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(5.0, 5.0, 10.0, 10.0))
    }

    fn on_collide(&mut self, _other: &dyn Entity, ctx: &mut EngineContext) -> Result<()> {
        if let Some(child) = self.child {
            ctx.commands.despawn(child);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "spawner"
    }
}

#[test]
fn test_commands_apply_at_phase_boundaries() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Spawner {
        log: log.clone(),
        child: None,
    });

    let mut surface = surface();
    engine.step(1.0 / 60.0, &mut surface).unwrap();

    // The child joins after the update phase, collides in the same frame,
    // and is despawned before rendering.
    assert_eq!(
        entries(&log),
        vec!["update spawner", "collide child with spawner", "render spawner"]
    );
    assert_eq!(engine.entities().len(), 1);
}

struct Failing;

impl Entity for Failing {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        Err(anyhow!("broken entity"))
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

#[test]
fn test_update_error_aborts_frame() {
    let log = new_log();
    let mut engine = engine();
    engine.add(Failing);
    engine.add_ui(Overlay { log: log.clone() });

    let err = engine.step(0.016, &mut surface()).unwrap_err();
    assert!(format!("{err:#}").contains("broken entity"));
    assert!(entries(&log).is_empty());
    assert_eq!(engine.context().frame_count(), 0);
}

/// A button that switches scenes when clicked.
struct SceneButton {
    log: Log,
}

impl Entity for SceneButton {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {}

    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(0.0, 0.0, 100.0, 40.0))
    }

    fn accepts_clicks(&self) -> bool {
        true
    }

    fn on_click(&mut self, ctx: &mut EngineContext) -> Result<()> {
        ctx.commands.load_scene(Level {
            name: "next",
            log: self.log.clone(),
        });
        Ok(())
    }
}

#[test]
fn test_click_can_queue_scene_change() {
    let log = new_log();
    let mut engine = engine();
    engine.add(SceneButton { log: log.clone() });

    assert!(engine.click(50.0, 20.0).unwrap());
    assert_eq!(engine.active_scene_name(), Some("next"));
    assert_eq!(entries(&log), vec!["next enter with 1 entities and 0 ui"]);
}

/// A scene with no content of its own.
struct Blank(&'static str);

impl Scene for Blank {
    fn name(&self) -> &str {
        self.0
    }
}

/// Queues a spawn while entering instead of adding directly.
struct QueueOnEnter {
    log: Log,
}

impl Scene for QueueOnEnter {
    fn name(&self) -> &str {
        "queue-on-enter"
    }

    fn on_enter(&mut self, engine: &mut Engine) -> Result<()> {
        engine
            .context_mut()
            .commands
            .spawn(Probe::new("leftover", &self.log));
        Ok(())
    }
}

#[test]
fn test_scene_change_drops_commands_queued_by_previous_scene() {
    let log = new_log();
    let mut engine = engine();
    engine.load_scene(QueueOnEnter { log: log.clone() }).unwrap();
    engine.load_scene(Blank("b")).unwrap();

    engine.step(0.016, &mut surface()).unwrap();
    assert_eq!(engine.active_scene_name(), Some("b"));
    assert_eq!(engine.entities().len(), 0);
    assert!(entries(&log).is_empty());
}

/// Queues a scene change from its update.
struct Switcher;

impl Entity for Switcher {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        ctx.commands.load_scene(Blank("b"));
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

/// Queues a spawn from its update.
struct Breeder {
    log: Log,
}

impl Entity for Breeder {
    fn update(&mut self, ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        ctx.commands.spawn(Probe::new("offspring", &self.log));
        Ok(())
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

#[test]
fn test_commands_behind_scene_change_are_dropped() {
    let log = new_log();
    let mut engine = engine();
    engine.load_scene(Blank("a")).unwrap();
    engine.add(Switcher);
    engine.add(Breeder { log: log.clone() });

    engine.step(0.016, &mut surface()).unwrap();
    assert_eq!(engine.active_scene_name(), Some("b"));
    assert_eq!(engine.entities().len(), 0);
    assert!(entries(&log).is_empty());
}

#[test]
fn test_snapping_camera_reaches_target_on_first_frame() {
    let mut engine = engine();
    engine.context_mut().camera.follow(Vec2::new(50.0, 50.0));

    engine.frame(1.0, &mut surface()).unwrap();
    assert_eq!(engine.context().camera.position, Vec2::new(50.0, 50.0));
}

struct FailingOverlay;

impl UiElement for FailingOverlay {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        Err(anyhow!("broken overlay"))
    }

    fn render(&self, _surface: &mut dyn Surface) {}
}

#[test]
fn test_ui_update_error_names_element() {
    let mut engine = engine();
    let id = engine.add_ui(FailingOverlay);

    let err = engine.step(0.016, &mut surface()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken overlay"));
    assert!(message.contains(&format!("ui update failed for element {}", id.to_u32())));
}
