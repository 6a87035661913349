use anyhow::{Context, Result};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use crate::{
    assets::{AssetLoader, AssetProvider},
    audio::{AudioProvider, SilentAudio},
    camera::Camera,
    canvas::Canvas,
    collision,
    config::EngineConfig,
    entity::{Entity, EntityId, EntityRegistry, EntitySlot, UiElement, UiId},
    input::InputState,
    math::Vec2,
    physics::PhysicsWorld,
    present::Presenter,
    scene::{Scene, SceneSlot},
    surface::Surface,
    time::{SystemClock, TimeSource},
};

/// A structural change requested from inside a callback.
pub enum Command {
    Spawn(EntityId, Box<dyn Entity>),
    Despawn(EntityId),
    AddUi(UiId, Box<dyn UiElement>),
    RemoveUi(UiId),
    LoadScene(Box<dyn Scene>),
}

/// Deferred command queue handed to entity, UI and click callbacks.
///
/// Callbacks cannot touch the registries they are being iterated from, so
/// they queue changes here. The engine applies the queue after the update
/// phase, after the collision pass, after the UI phase and after click
/// dispatch. Ids are allocated immediately so a spawner can keep a handle to
/// what it spawned.
#[derive(Default)]
pub struct Commands {
    queue: Vec<Command>,
    next_entity: u32,
    next_ui: u32,
}

impl Commands {
    pub fn spawn(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.spawn_boxed(Box::new(entity))
    }

    pub fn spawn_boxed(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = self.next_entity_id();
        self.queue.push(Command::Spawn(id, entity));
        id
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.queue.push(Command::Despawn(id));
    }

    pub fn add_ui(&mut self, element: impl UiElement + 'static) -> UiId {
        let id = self.next_ui_id();
        self.queue.push(Command::AddUi(id, Box::new(element)));
        id
    }

    pub fn remove_ui(&mut self, id: UiId) {
        self.queue.push(Command::RemoveUi(id));
    }

    pub fn load_scene(&mut self, scene: impl Scene + 'static) {
        self.load_scene_boxed(Box::new(scene));
    }

    pub fn load_scene_boxed(&mut self, scene: Box<dyn Scene>) {
        self.queue.push(Command::LoadScene(scene));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn next_entity_id(&mut self) -> EntityId {
        self.next_entity += 1;
        EntityId(self.next_entity)
    }

    fn next_ui_id(&mut self) -> UiId {
        self.next_ui += 1;
        UiId(self.next_ui)
    }

    fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }

    /// Drop queued entity and UI changes, keeping scene loads. Returns how
    /// many commands were dropped.
    fn discard_structural(&mut self) -> usize {
        let before = self.queue.len();
        self.queue
            .retain(|command| matches!(command, Command::LoadScene(_)));
        before - self.queue.len()
    }
}

/// Shared state handed to every callback.
///
/// Subsystems are public fields so a callback can borrow several at once
/// (read input while steering a physics body, for example).
pub struct EngineContext {
    pub input: InputState,
    pub physics: PhysicsWorld,
    pub camera: Camera,
    pub assets: Box<dyn AssetProvider>,
    pub audio: Box<dyn AudioProvider>,
    pub commands: Commands,
    surface_size: (u32, u32),
    delta_time: f32,
    elapsed_time: f64,
    frame_count: u64,
    exit_requested: bool,
}

impl EngineContext {
    fn new(config: &EngineConfig) -> Self {
        let mut camera = Camera::default();
        camera.set_lerp(config.camera_lerp);
        if let Err(err) = camera.set_zoom(config.camera_zoom) {
            log::warn!("{err}; keeping zoom {}", camera.zoom());
        }

        Self {
            input: InputState::new(),
            physics: PhysicsWorld::with_gravity(config.gravity),
            camera,
            assets: Box::new(AssetLoader::new()),
            audio: Box::new(SilentAudio::default()),
            commands: Commands::default(),
            surface_size: (config.width, config.height),
            delta_time: 0.0,
            elapsed_time: 0.0,
            frame_count: 0,
            exit_requested: false,
        }
    }

    /// Size of the surface the current frame renders to.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Seconds covered by the current frame.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total simulated seconds across completed frames.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Number of completed frames.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Ask the host to stop calling the engine after this frame.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Mouse position converted through the current camera.
    pub fn mouse_world(&self) -> Vec2 {
        let (w, h) = self.surface_size;
        self.camera
            .screen_to_world(self.input.mouse_position(), w as f32, h as f32)
    }
}

/// The frame scheduler: owns entities, UI, the active scene and the context.
///
/// Each frame runs, in order: physics step, camera update, entity updates,
/// one collision pass, surface clear, world render through the camera, UI
/// update and render in screen space, then the input flush.
pub struct Engine {
    config: EngineConfig,
    ctx: EngineContext,
    entities: EntityRegistry,
    ui: Vec<(UiId, Box<dyn UiElement>)>,
    scene: SceneSlot,
    clock: Box<dyn TimeSource>,
    last_time: Option<f64>,
}

impl Engine {
    /// Create an engine with silent audio, an empty asset store and the system clock.
    pub fn new(config: EngineConfig) -> Self {
        let ctx = EngineContext::new(&config);
        Self {
            config,
            ctx,
            entities: EntityRegistry::new(),
            ui: Vec::new(),
            scene: SceneSlot::default(),
            clock: Box::new(SystemClock::new()),
            last_time: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl AudioProvider + 'static) -> Self {
        self.ctx.audio = Box::new(audio);
        self
    }

    #[must_use]
    pub fn with_assets(mut self, assets: impl AssetProvider + 'static) -> Self {
        self.ctx.assets = Box::new(assets);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn ui_len(&self) -> usize {
        self.ui.len()
    }

    pub fn is_running(&self) -> bool {
        self.last_time.is_some()
    }

    pub fn exit_requested(&self) -> bool {
        self.ctx.exit_requested
    }

    /// Record the current time as the previous frame time.
    pub fn start(&mut self) {
        self.last_time = Some(self.clock.now());
        log::debug!("engine started");
    }

    /// Run one frame timed by the engine's clock.
    pub fn tick(&mut self, surface: &mut dyn Surface) -> Result<()> {
        let now = self.clock.now();
        self.frame(now, surface)
    }

    /// Run one frame from a host-supplied timestamp in seconds.
    ///
    /// The first frame after construction runs with `dt = 0`. A timestamp
    /// earlier than the previous one also yields `dt = 0`.
    pub fn frame(&mut self, timestamp: f64, surface: &mut dyn Surface) -> Result<()> {
        let dt = match self.last_time.replace(timestamp) {
            Some(last) => (timestamp - last).max(0.0) as f32,
            None => 0.0,
        };
        self.step(dt, surface)
    }

    /// Run one frame with an explicit `dt` in seconds.
    pub fn step(&mut self, dt: f32, surface: &mut dyn Surface) -> Result<()> {
        self.ctx.delta_time = dt;
        self.ctx.surface_size = surface.size();

        self.ctx.physics.step(dt);
        self.ctx.camera.update(dt, &self.ctx.physics);

        for slot in self.entities.slots_mut() {
            slot.entity
                .update(&mut self.ctx, dt)
                .with_context(|| format!("update failed for {}", slot.entity.name()))?;
        }
        self.apply_commands()?;
        self.entities.refresh();

        let ctx = &mut self.ctx;
        let (slots, candidates) = self.entities.collision_view();
        collision::pairwise_pass(
            slots,
            candidates,
            |slot: &EntitySlot| slot.entity.bounds(),
            |a: &mut EntitySlot, b: &mut EntitySlot| {
                a.entity.on_collide(b.entity.as_ref(), ctx)?;
                b.entity.on_collide(a.entity.as_ref(), ctx)
            },
        )?;
        self.apply_commands()?;

        surface.clear();
        surface.save();
        let (width, height) = surface.size();
        self.ctx.camera.apply(surface, width as f32, height as f32);
        self.entities.render_all(surface);
        surface.restore();

        for (id, element) in &mut self.ui {
            element
                .update(&mut self.ctx, dt)
                .with_context(|| format!("ui update failed for element {}", id.to_u32()))?;
            element.render(surface);
        }
        self.apply_commands()?;

        self.ctx.input.flush();
        self.ctx.frame_count += 1;
        self.ctx.elapsed_time += f64::from(dt);
        Ok(())
    }

    /// Register an entity. Draw order and the collidable set update immediately.
    pub fn add(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.add_boxed(Box::new(entity))
    }

    pub fn add_boxed(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = self.ctx.commands.next_entity_id();
        self.insert_entity(id, entity);
        id
    }

    /// Unregister an entity and hand it back.
    pub fn remove(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let removed = self.entities.remove(id);
        if removed.is_some() {
            log::debug!("removed entity {}", id.to_u32());
        }
        removed
    }

    pub fn add_ui(&mut self, element: impl UiElement + 'static) -> UiId {
        let id = self.ctx.commands.next_ui_id();
        self.ui.push((id, Box::new(element)));
        id
    }

    pub fn remove_ui(&mut self, id: UiId) -> Option<Box<dyn UiElement>> {
        let index = self.ui.iter().position(|(ui_id, _)| *ui_id == id)?;
        Some(self.ui.remove(index).1)
    }

    /// Drop every entity and UI element.
    pub fn clear_entities(&mut self) {
        log::debug!(
            "clearing {} entities and {} ui elements",
            self.entities.len(),
            self.ui.len()
        );
        self.entities.clear();
        self.ui.clear();
    }

    /// Recompute draw order and the collidable set after entities changed
    /// their z-index, collidable flag or bounds presence.
    pub fn refresh_order(&mut self) {
        self.entities.refresh();
    }

    /// Dispatch a click at surface coordinates `(x, y)`.
    ///
    /// Entities are tested topmost first against their bounds, inclusive of
    /// edges. Only the first clickable hit receives `on_click`. Returns whether
    /// any entity was hit.
    pub fn click(&mut self, x: f32, y: f32) -> Result<bool> {
        let Some(slot) = self.entities.click_target(x, y) else {
            return Ok(false);
        };
        log::debug!("click ({x}, {y}) hit {}", slot.entity.name());
        slot.entity.on_click(&mut self.ctx)?;
        self.apply_commands()?;
        Ok(true)
    }

    /// Replace the active scene.
    ///
    /// The current scene (if any) exits, then every entity and UI element is
    /// cleared before `next` enters. Entity and UI commands the outgoing scene
    /// left queued are dropped with it. If a hook fails the error is returned
    /// and no scene is active.
    pub fn load_scene(&mut self, next: impl Scene + 'static) -> Result<()> {
        self.load_scene_boxed(Box::new(next))
    }

    pub fn load_scene_boxed(&mut self, mut next: Box<dyn Scene>) -> Result<()> {
        if let Some(mut current) = self.scene.take() {
            log::debug!("exiting scene \"{}\"", current.name());
            current
                .on_exit(self)
                .with_context(|| format!("scene \"{}\" failed to exit", current.name()))?;
            self.clear_entities();
            let dropped = self.ctx.commands.discard_structural();
            if dropped > 0 {
                log::debug!("dropped {dropped} queued commands from the previous scene");
            }
        }

        log::debug!("entering scene \"{}\"", next.name());
        next.on_enter(self)
            .with_context(|| format!("scene \"{}\" failed to enter", next.name()))?;
        self.scene.set(next);
        Ok(())
    }

    pub fn active_scene_name(&self) -> Option<&str> {
        self.scene.name()
    }

    fn insert_entity(&mut self, id: EntityId, entity: Box<dyn Entity>) {
        log::debug!("added entity {} ({})", id.to_u32(), entity.name());
        self.entities.insert(id, entity);
    }

    fn apply_commands(&mut self) -> Result<()> {
        loop {
            let batch = self.ctx.commands.drain();
            if batch.is_empty() {
                return Ok(());
            }
            let mut batch = batch.into_iter();
            while let Some(command) = batch.next() {
                match command {
                    Command::Spawn(id, entity) => self.insert_entity(id, entity),
                    Command::Despawn(id) => {
                        self.remove(id);
                    }
                    Command::AddUi(id, element) => self.ui.push((id, element)),
                    Command::RemoveUi(id) => {
                        self.remove_ui(id);
                    }
                    Command::LoadScene(scene) => {
                        self.load_scene_boxed(scene)?;
                        // The rest of the batch belongs to the scene that just exited.
                        let dropped = batch.len();
                        if dropped > 0 {
                            log::debug!("dropped {dropped} commands queued behind a scene change");
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Open a window, enter `scene` and run until the window closes, a
    /// callback requests exit, or a frame fails.
    ///
    /// Frames render into a software canvas of the configured size, which is
    /// stretched to fill the window. Frame errors are logged and end the loop.
    #[allow(deprecated)]
    pub fn run(mut self, scene: impl Scene + 'static) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = event_loop.create_window(window_attributes)?;

        // The presenter borrows the window for the rest of the program.
        let window: &'static Window = Box::leak(Box::new(window));

        let mut presenter = Presenter::new(window, self.config.vsync)?;
        let mut canvas = Canvas::new(self.config.width, self.config.height)
            .with_clear_color(self.config.clear_color);
        if let Some(path) = &self.config.font {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read font {}", path.display()))?;
            canvas.load_font(bytes)?;
        }

        self.load_scene(scene)?;
        self.start();

        event_loop.run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => presenter.resize(new_size),
                WindowEvent::KeyboardInput { event, .. } => self.ctx.input.handle_key(&event),
                WindowEvent::CursorMoved { position, .. } => {
                    let p = to_canvas(position, presenter.size(), canvas.size());
                    self.ctx.input.handle_cursor_moved(p.x, p.y);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    self.ctx.input.handle_mouse_button(button, state);
                    if state == ElementState::Pressed && button == MouseButton::Left {
                        let p = self.ctx.input.mouse_position();
                        if let Err(err) = self.click(p.x, p.y) {
                            log::error!("Encountered error during click: {err:?}");
                            elwt.exit();
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = presenter.present(&canvas) {
                        log::error!("Encountered error during present: {err:?}");
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if let Err(err) = self.tick(&mut canvas) {
                    log::error!("Encountered error during frame: {err:?}");
                    elwt.exit();
                    return;
                }
                if self.exit_requested() {
                    elwt.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        })?;

        Ok(())
    }
}

/// Map a window-pixel position onto canvas pixels.
fn to_canvas(
    position: PhysicalPosition<f64>,
    window: (u32, u32),
    canvas: (u32, u32),
) -> PhysicalPosition<f64> {
    let sx = f64::from(canvas.0) / f64::from(window.0.max(1));
    let sy = f64::from(canvas.1) / f64::from(window.1.max(1));
    PhysicalPosition::new(position.x * sx, position.y * sy)
}
