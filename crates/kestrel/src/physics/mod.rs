//! # Physics — Rigid Bodies Behind a Backend Trait
//!
//! The [`PhysicsSystem`] is a thin adapter: it owns a [`PhysicsBackend`] and
//! keeps one body per registered [`PhysicsComponent`] in it. The solver
//! itself is the backend's business.
//!
//! ```text
//! add(c)       backend.insert_body(desc) ──► c.handle
//! update(dt)   evict removed ──► backend.remove_body(handle)   once per body
//!              backend.step(dt)
//!              for live c: c.pose = backend.pose(handle)
//! draw(r)      r.draw_debug_box(..) for every body            if enabled
//! ```
//!
//! Eviction runs before the step, so a body whose component was removed is
//! never stepped or read again, even though it stayed in the backend until
//! this pass.
//!
//! Two backends ship with the crate: [`NullBackend`], which keeps bodies
//! where they were created, and `RapierBackend` behind the `physics3d`
//! feature.

#[cfg(feature = "physics3d")]
mod rapier;

#[cfg(feature = "physics3d")]
pub use rapier::RapierBackend;

use slotmap::{SlotMap, new_key_type};

use crate::config::PhysicsConfig;
use crate::ecs::{Capabilities, Capability, Component, ComponentRef, ComponentSet, System};
use crate::math::{Quat, Transform, Vec3};
use crate::render::{Color, Renderer};

new_key_type! {
    /// Opaque body handle issued by a [`PhysicsBackend`].
    pub struct BodyHandle;
}

const DEBUG_COLOR: Color = [0.2, 1.0, 0.3, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
}

/// Everything a backend needs to create a box-shaped rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub half_extents: Vec3,
    pub translation: Vec3,
    pub rotation: Quat,
    pub restitution: f32,
    pub density: f32,
}

impl BodyDesc {
    /// A dynamic box with the given half extents.
    pub fn dynamic_box(half_extents: Vec3) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            half_extents,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            restitution: 0.0,
            density: 1.0,
        }
    }

    /// A static box with the given half extents.
    pub fn fixed_box(half_extents: Vec3) -> Self {
        Self {
            kind: BodyKind::Fixed,
            ..Self::dynamic_box(half_extents)
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Pose the body is created with.
    pub fn initial_pose(&self) -> Transform {
        Transform::from_translation(self.translation).with_rotation(self.rotation)
    }
}

/// The rigid-body solver as seen from the simulation.
pub trait PhysicsBackend {
    fn insert_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Remove a body. Unknown handles are ignored.
    fn remove_body(&mut self, handle: BodyHandle);

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f32);

    /// Current pose of a body (unit scale), or `None` for unknown handles.
    fn pose(&self, handle: BodyHandle) -> Option<Transform>;

    /// Pose and half extents of every body, for debug drawing.
    fn debug_shapes(&self) -> Vec<(Transform, Vec3)>;

    fn body_count(&self) -> usize;
}

/// A backend that never moves anything.
#[derive(Debug, Default)]
pub struct NullBackend {
    bodies: SlotMap<BodyHandle, BodyDesc>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhysicsBackend for NullBackend {
    fn insert_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.bodies.insert(*desc)
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(handle);
    }

    fn step(&mut self, _dt: f32) {}

    fn pose(&self, handle: BodyHandle) -> Option<Transform> {
        self.bodies.get(handle).map(BodyDesc::initial_pose)
    }

    fn debug_shapes(&self) -> Vec<(Transform, Vec3)> {
        self.bodies
            .values()
            .map(|desc| (desc.initial_pose(), desc.half_extents))
            .collect()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// A rigid body that also serves as its entity's transform.
///
/// The pose is copied out of the backend after every step. `visual_scale`
/// is reported as the transform's scale so a model sized in file units can
/// sit on a body sized in meters.
#[derive(Debug)]
pub struct PhysicsComponent {
    desc: BodyDesc,
    handle: Option<BodyHandle>,
    pose: Transform,
    visual_scale: Vec3,
}

impl PhysicsComponent {
    pub fn new(desc: BodyDesc) -> Self {
        Self {
            desc,
            handle: None,
            pose: desc.initial_pose(),
            visual_scale: Vec3::ONE,
        }
    }

    pub fn with_visual_scale(mut self, scale: f32) -> Self {
        self.visual_scale = Vec3::splat(scale);
        self
    }

    pub fn desc(&self) -> &BodyDesc {
        &self.desc
    }

    /// The backend body, once registered with a [`PhysicsSystem`].
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }

    /// Last pose read back from the backend (unit scale).
    pub fn pose(&self) -> Transform {
        self.pose
    }
}

impl Component for PhysicsComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::of(&[Capability::Physics, Capability::Transform])
    }

    fn transform(&self) -> Option<Transform> {
        Some(self.pose.with_scale_xyz(self.visual_scale))
    }
}

fn body_view<'a>(component: &'a mut (dyn Component + 'static)) -> Option<&'a mut PhysicsComponent> {
    component.view_mut(Capability::Physics)?.downcast_mut()
}

/// Keeps a backend body for every Physics-capability component.
pub struct PhysicsSystem {
    backend: Box<dyn PhysicsBackend>,
    components: ComponentSet,
    ground: Option<BodyHandle>,
    debug_draw: bool,
    released: u64,
}

impl PhysicsSystem {
    /// Wrap `backend`, adding the static ground box if the config has one.
    pub fn new(config: &PhysicsConfig, mut backend: Box<dyn PhysicsBackend>) -> Self {
        let ground = config.ground.map(|half| {
            let half = Vec3::from(half);
            // Top face at z = 0.
            let desc = BodyDesc::fixed_box(half).at(Vec3::new(0.0, 0.0, -half.z));
            log::debug!("physics: ground box {half}");
            backend.insert_body(&desc)
        });
        Self {
            backend,
            components: ComponentSet::new(),
            ground,
            debug_draw: config.debug_draw,
            released: 0,
        }
    }

    pub fn backend(&self) -> &dyn PhysicsBackend {
        self.backend.as_ref()
    }

    pub fn ground(&self) -> Option<BodyHandle> {
        self.ground
    }

    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_draw = enabled;
    }

    /// Bodies removed from the backend through eviction so far.
    pub fn released_bodies(&self) -> u64 {
        self.released
    }

    fn sweep(&mut self) {
        let backend = &mut self.backend;
        let mut released = 0;
        self.components.evict(|c| {
            let handle = body_view(&mut *c.borrow_mut()).and_then(|body| body.handle.take());
            if let Some(handle) = handle {
                backend.remove_body(handle);
                released += 1;
            }
        });
        if released > 0 {
            log::trace!("physics: released {released} body(ies)");
        }
        self.released += released;
    }
}

impl System for PhysicsSystem {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn capability(&self) -> Capability {
        Capability::Physics
    }

    /// # Panics
    ///
    /// Panics if the component declares `Physics` but exposes no
    /// [`PhysicsComponent`] view, or if it already owns a body.
    fn add(&mut self, component: ComponentRef) {
        {
            let mut inner = component.borrow_mut();
            let Some(body) = body_view(&mut *inner) else {
                panic!("component {:?} declares Physics but has no physics view", component.id());
            };
            assert!(body.handle.is_none(), "component {:?} already owns a body", component.id());
            let handle = self.backend.insert_body(&body.desc);
            body.handle = Some(handle);
            if let Some(pose) = self.backend.pose(handle) {
                body.pose = pose;
            }
        }
        self.components.insert(component);
    }

    fn update(&mut self, dt: f64) {
        self.sweep();
        self.backend.step(dt as f32);

        for component in self.components.live() {
            let mut inner = component.borrow_mut();
            let Some(body) = body_view(&mut *inner) else {
                continue;
            };
            if let Some(pose) = body.handle.and_then(|h| self.backend.pose(h)) {
                body.pose = pose;
            }
        }
    }

    fn draw(&mut self, renderer: &mut dyn Renderer) {
        self.sweep();
        if !self.debug_draw {
            return;
        }
        for (pose, half_extents) in self.backend.debug_shapes() {
            renderer.draw_debug_box(&pose, half_extents, DEBUG_COLOR);
        }
    }

    fn len(&self) -> usize {
        self.components.len()
    }
}
