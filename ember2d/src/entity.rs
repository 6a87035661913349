//! Entity and UI capability traits, plus the registry that owns live entities.

use anyhow::Result;

use crate::collision::Bounds;
use crate::engine::EngineContext;
use crate::surface::Surface;

/// Unique identifier for an entity registered with an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    /// Get the underlying integer ID (useful for debugging or logging).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Unique identifier for a UI element registered with an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UiId(pub(crate) u32);

impl UiId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// A world-space object driven by the frame loop.
///
/// Only `update` and `render` are required. Collision and click handling are
/// opt-in: return `true` from [`Entity::collidable`] (and some bounds) to take
/// part in the collision pass, and from [`Entity::accepts_clicks`] to receive
/// [`Entity::on_click`].
pub trait Entity {
    /// Advance by `dt` seconds.
    fn update(&mut self, ctx: &mut EngineContext, dt: f32) -> Result<()>;

    /// Draw in world space. The camera transform is already applied.
    fn render(&self, surface: &mut dyn Surface);

    /// Draw order; higher values are drawn later (on top).
    fn z_index(&self) -> i32 {
        0
    }

    fn collidable(&self) -> bool {
        false
    }

    fn bounds(&self) -> Option<Bounds> {
        None
    }

    fn accepts_clicks(&self) -> bool {
        false
    }

    fn on_click(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Called once per frame for every other collidable entity whose bounds
    /// overlap this one's.
    fn on_collide(&mut self, _other: &dyn Entity, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Human-readable name for logs and collision filtering.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A screen-space overlay drawn after all entities, without the camera.
pub trait UiElement {
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        Ok(())
    }

    fn render(&self, surface: &mut dyn Surface);
}

pub(crate) struct EntitySlot {
    pub(crate) id: EntityId,
    pub(crate) entity: Box<dyn Entity>,
}

/// Owns live entities in registration order and caches the two derived views
/// the frame loop needs: draw order and the collidable subset.
#[derive(Default)]
pub struct EntityRegistry {
    slots: Vec<EntitySlot>,
    /// Indices into `slots`, stably sorted by z-index.
    render_order: Vec<usize>,
    /// Ascending indices of entities that are collidable and have bounds.
    collidables: Vec<usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    pub(crate) fn insert(&mut self, id: EntityId, entity: Box<dyn Entity>) {
        self.slots.push(EntitySlot { id, entity });
        self.refresh();
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let index = self.position(id)?;
        let slot = self.slots.remove(index);
        self.refresh();
        Some(slot.entity)
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.render_order.clear();
        self.collidables.clear();
    }

    /// Recompute draw order and the collidable subset from current entity state.
    pub fn refresh(&mut self) {
        let slots = &self.slots;

        self.render_order.clear();
        self.render_order.extend(0..slots.len());
        self.render_order
            .sort_by_key(|&i| slots[i].entity.z_index());

        self.collidables.clear();
        self.collidables.extend(
            slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.entity.collidable() && s.entity.bounds().is_some())
                .map(|(i, _)| i),
        );
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.position(id).map(|i| self.slots[i].entity.as_ref())
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().map(|s| s.id)
    }

    /// Ids in draw order, bottom first.
    pub fn render_order(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.render_order.iter().map(|&i| self.slots[i].id)
    }

    pub fn collidable_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.collidables.iter().map(|&i| self.slots[i].id)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [EntitySlot] {
        &mut self.slots
    }

    pub(crate) fn collision_view(&mut self) -> (&mut [EntitySlot], &[usize]) {
        (&mut self.slots, &self.collidables)
    }

    pub(crate) fn render_all(&self, surface: &mut dyn Surface) {
        for &i in &self.render_order {
            self.slots[i].entity.render(surface);
        }
    }

    /// Topmost entity that accepts clicks and whose bounds contain the point.
    pub(crate) fn click_target(&mut self, x: f32, y: f32) -> Option<&mut EntitySlot> {
        let slots = &self.slots;
        let index = self.render_order.iter().rev().copied().find(|&i| {
            let entity = &slots[i].entity;
            entity.accepts_clicks()
                && entity
                    .bounds()
                    .is_some_and(|b| b.contains_point(x, y))
        })?;
        self.slots.get_mut(index)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker {
        z: i32,
        bounds: Option<Bounds>,
        collidable: bool,
        clickable: bool,
    }

    impl Marker {
        fn at_z(z: i32) -> Box<Self> {
            Box::new(Self {
                z,
                bounds: None,
                collidable: false,
                clickable: false,
            })
        }
    }

    impl Entity for Marker {
        fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
            Ok(())
        }

        fn render(&self, _surface: &mut dyn Surface) {}

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
    }

    fn ids(raw: &[u32]) -> Vec<EntityId> {
        raw.iter().map(|&n| EntityId(n)).collect()
    }

    #[test]
    fn test_render_order_stable_by_z() {
        let mut registry = EntityRegistry::new();
        registry.insert(EntityId(1), Marker::at_z(5));
        registry.insert(EntityId(2), Marker::at_z(0));
        registry.insert(EntityId(3), Marker::at_z(5));
        registry.insert(EntityId(4), Marker::at_z(-1));
        registry.insert(EntityId(5), Marker::at_z(0));

        let order: Vec<_> = registry.render_order().collect();
        assert_eq!(order, ids(&[4, 2, 5, 1, 3]));
        let registration: Vec<_> = registry.ids().collect();
        assert_eq!(registration, ids(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_collidables_require_flag_and_bounds() {
        let mut registry = EntityRegistry::new();
        let b = Some(Bounds::new(0.0, 0.0, 1.0, 1.0));
        for (n, (collidable, bounds)) in
            [(true, b), (true, None), (false, b), (true, b)].into_iter().enumerate()
        {
            registry.insert(
                EntityId(n as u32 + 1),
                Box::new(Marker {
                    z: 0,
                    bounds,
                    collidable,
                    clickable: false,
                }),
            );
        }
        let collidable: Vec<_> = registry.collidable_ids().collect();
        assert_eq!(collidable, ids(&[1, 4]));
    }

    #[test]
    fn test_remove_returns_entity_and_updates_caches() {
        let mut registry = EntityRegistry::new();
        registry.insert(EntityId(1), Marker::at_z(1));
        registry.insert(EntityId(2), Marker::at_z(0));

        let removed = registry.remove(EntityId(2)).expect("registered");
        assert_eq!(removed.z_index(), 0);
        assert!(registry.remove(EntityId(2)).is_none());
        assert_eq!(registry.render_order().collect::<Vec<_>>(), ids(&[1]));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.render_order().count(), 0);
    }

    #[test]
    fn test_click_target_is_topmost_clickable() {
        let mut registry = EntityRegistry::new();
        let area = Some(Bounds::new(0.0, 0.0, 10.0, 10.0));
        let clickable = |z| {
            Box::new(Marker {
                z,
                bounds: area,
                collidable: false,
                clickable: true,
            })
        };
        registry.insert(EntityId(1), clickable(2));
        registry.insert(EntityId(2), clickable(1));
        registry.insert(
            EntityId(3),
            Box::new(Marker {
                z: 9,
                bounds: area,
                collidable: false,
                clickable: false,
            }),
        );

        let hit = registry.click_target(10.0, 10.0).map(|s| s.id);
        assert_eq!(hit, Some(EntityId(1)));
        assert!(registry.click_target(10.5, 0.0).is_none());
    }
}
