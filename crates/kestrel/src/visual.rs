//! # Visual — Drawable Components
//!
//! Visual-capability components are drawn by the [`VisualSystem`] once per
//! frame. The system is the only thing that releases their GPU-side
//! resources, and it does so lazily: a removed model keeps its slot until the
//! next pass, which releases it and frees the slot.
//!
//! ## Frame layout
//!
//! ```text
//! draw()
//!   ├─ evict removed entries (release each once)
//!   ├─ forget the sun if it was removed
//!   ├─ renderer.set_sun_direction(sun)      if a sun is live
//!   └─ for each live entry: render()        insertion order
//! ```
//!
//! ## Transform discovery
//!
//! A [`ModelComponent`] has no position of its own once its entity is linked:
//! `on_link` looks for a sibling `Transform` component (usually a physics
//! body) and reads it at draw time. Without one the model uses the static
//! transform it was created with.

use crate::asset::Model;
use crate::ecs::{
    Capabilities, Capability, Component, ComponentRef, ComponentSet, Entity, System,
    WeakComponentRef,
};
use crate::math::Transform;
use crate::render::{Color, Renderer};

pub use crate::render::Visual;

/// A loaded model placed in the world.
#[derive(Debug)]
pub struct ModelComponent {
    model: Model,
    color: Color,
    transform: Transform,
    source: Option<WeakComponentRef>,
    released: bool,
}

impl ModelComponent {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            color: [1.0; 4],
            transform: Transform::IDENTITY,
            source: None,
            released: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Transform used when no sibling provides one.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn has_transform_source(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.upgrade().is_some())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Where the model is drawn this frame.
    pub fn current_transform(&self) -> Transform {
        self.source
            .as_ref()
            .and_then(WeakComponentRef::upgrade)
            .filter(|source| !source.is_removed())
            .and_then(|source| source.borrow().transform())
            .unwrap_or(self.transform)
    }
}

impl Component for ModelComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from(Capability::Visual)
    }

    fn on_link(&mut self, entity: &Entity) {
        self.source = entity
            .get_component(Capability::Transform)
            .map(|c| c.downgrade());
        if self.source.is_none() {
            log::debug!("model on entity {} has no transform sibling", entity.id());
        }
    }

    fn as_visual(&self) -> Option<&dyn Visual> {
        Some(self)
    }

    fn as_visual_mut(&mut self) -> Option<&mut dyn Visual> {
        Some(self)
    }
}

impl Visual for ModelComponent {
    fn render(&self, renderer: &mut dyn Renderer) {
        renderer.draw_mesh(
            self.model.mesh,
            self.model.vertex_count,
            self.color,
            &self.current_transform(),
        );
    }

    fn release(&mut self) {
        self.released = true;
        self.source = None;
    }
}

/// Draws every Visual-capability component.
#[derive(Default)]
pub struct VisualSystem {
    components: ComponentSet,
    sun: Option<ComponentRef>,
}

impl VisualSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// The light source currently feeding the renderer, if any.
    pub fn sun(&self) -> Option<&ComponentRef> {
        self.sun.as_ref()
    }

    fn sweep(&mut self) {
        if self.sun.as_ref().is_some_and(ComponentRef::is_removed) {
            log::debug!("visual: sun removed");
            self.sun = None;
        }
        let evicted = self.components.evict(|c| {
            if let Some(visual) = c.borrow_mut().as_visual_mut() {
                visual.release();
            }
        });
        if evicted > 0 {
            log::trace!("visual: evicted {evicted} component(s)");
        }
    }
}

impl System for VisualSystem {
    fn name(&self) -> &'static str {
        "visual"
    }

    fn capability(&self) -> Capability {
        Capability::Visual
    }

    /// # Panics
    ///
    /// Panics if the component declares `Visual` but exposes no [`Visual`]
    /// view.
    fn add(&mut self, component: ComponentRef) {
        let is_sun = {
            let inner = component.borrow();
            let Some(visual) = inner.as_visual() else {
                panic!("component {:?} declares Visual but has no visual view", component.id());
            };
            visual.sun_direction().is_some()
        };
        if is_sun {
            if self.sun.as_ref().is_some_and(|s| !s.is_removed()) {
                log::warn!("visual: a second sun replaces the current one");
            }
            self.sun = Some(component.clone());
        }
        self.components.insert(component);
    }

    fn update(&mut self, _dt: f64) {
        self.sweep();
    }

    fn draw(&mut self, renderer: &mut dyn Renderer) {
        self.sweep();

        if let Some(direction) = self
            .sun
            .as_ref()
            .and_then(|sun| sun.borrow().as_visual().and_then(|v| v.sun_direction()))
        {
            renderer.set_sun_direction(direction);
        }

        for component in self.components.live() {
            if let Some(visual) = component.borrow().as_visual() {
                visual.render(renderer);
            }
        }
    }

    fn len(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::render::{DrawCommand, DrawRecorder, MeshHandle};

    fn model(id: u64) -> Model {
        Model {
            mesh: MeshHandle(id),
            vertex_count: 3,
        }
    }

    struct Pose(Transform);

    impl Component for Pose {
        fn capabilities(&self) -> Capabilities {
            Capabilities::from(Capability::Transform)
        }

        fn transform(&self) -> Option<Transform> {
            Some(self.0)
        }
    }

    struct Lamp(Vec3);

    impl Component for Lamp {
        fn capabilities(&self) -> Capabilities {
            Capabilities::from(Capability::Visual)
        }

        fn as_visual(&self) -> Option<&dyn Visual> {
            Some(self)
        }
    }

    impl Visual for Lamp {
        fn render(&self, _renderer: &mut dyn Renderer) {}

        fn sun_direction(&self) -> Option<Vec3> {
            Some(self.0)
        }
    }

    #[test]
    fn model_follows_sibling_transform() {
        let entity = Entity::compound();
        let pose = Transform::from_xyz(1.0, 2.0, 3.0);
        entity.add(Pose(pose));
        let m = entity.add(ModelComponent::new(model(1)));
        entity.link();

        let m = m.downcast_ref::<ModelComponent>().unwrap();
        assert!(m.has_transform_source());
        assert_eq!(m.current_transform(), pose);
    }

    #[test]
    fn model_without_sibling_uses_static_transform() {
        let t = Transform::from_xyz(0.0, 0.0, 9.0);
        let m = ComponentRef::new(ModelComponent::new(model(1)).with_transform(t));
        let _e = Entity::with_component(m.clone());
        assert_eq!(m.downcast_ref::<ModelComponent>().unwrap().current_transform(), t);
    }

    #[test]
    fn draw_skips_and_releases_removed_models() {
        let mut system = VisualSystem::new();
        let keep = ComponentRef::new(ModelComponent::new(model(1)));
        let gone = ComponentRef::new(ModelComponent::new(model(2)));
        let _a = Entity::with_component(keep.clone());
        let b = Entity::with_component(gone.clone());
        system.add(keep);
        system.add(gone.clone());

        b.remove();
        let mut recorder = DrawRecorder::new();
        system.draw(&mut recorder);

        assert_eq!(system.len(), 1);
        assert_eq!(recorder.mesh_count(), 1);
        assert!(gone.downcast_ref::<ModelComponent>().unwrap().is_released());
    }

    #[test]
    fn sun_direction_is_sent_before_models() {
        let mut system = VisualSystem::new();
        system.add(ComponentRef::new(ModelComponent::new(model(1))));
        system.add(ComponentRef::new(Lamp(Vec3::Z)));

        let mut recorder = DrawRecorder::new();
        system.draw(&mut recorder);

        assert_eq!(recorder.commands()[0], DrawCommand::Sun(Vec3::Z));
        assert_eq!(recorder.mesh_count(), 1);
    }

    #[test]
    fn removed_sun_is_forgotten() {
        let mut system = VisualSystem::new();
        let lamp = ComponentRef::new(Lamp(Vec3::Z));
        let e = Entity::with_component(lamp.clone());
        system.add(lamp);
        assert!(system.sun().is_some());

        e.remove();
        system.update(0.0);
        assert!(system.sun().is_none());

        let mut recorder = DrawRecorder::new();
        system.draw(&mut recorder);
        assert!(recorder.sun().is_none());
    }

    #[test]
    #[should_panic(expected = "no visual view")]
    fn visual_tag_without_view_panics() {
        struct Liar;
        impl Component for Liar {
            fn capabilities(&self) -> Capabilities {
                Capabilities::from(Capability::Visual)
            }
        }
        VisualSystem::new().add(ComponentRef::new(Liar));
    }
}
