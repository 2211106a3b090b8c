//! End-to-end lifecycle checks through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kestrel::physics::BodyHandle;
use kestrel::prelude::*;
use kestrel::render::DrawCommand;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared counters for a [`CountingBackend`].
#[derive(Default)]
struct Counts {
    inserted: u32,
    removed: Vec<BodyHandle>,
    steps: u32,
}

/// Wraps a [`NullBackend`] and records every call.
struct CountingBackend {
    inner: NullBackend,
    counts: Rc<RefCell<Counts>>,
}

impl CountingBackend {
    fn new() -> (Self, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let backend = Self {
            inner: NullBackend::new(),
            counts: Rc::clone(&counts),
        };
        (backend, counts)
    }
}

impl PhysicsBackend for CountingBackend {
    fn insert_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.counts.borrow_mut().inserted += 1;
        self.inner.insert_body(desc)
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.counts.borrow_mut().removed.push(handle);
        self.inner.remove_body(handle);
    }

    fn step(&mut self, dt: f32) {
        self.counts.borrow_mut().steps += 1;
        self.inner.step(dt);
    }

    fn pose(&self, handle: BodyHandle) -> Option<Transform> {
        self.inner.pose(handle)
    }

    fn debug_shapes(&self) -> Vec<(Transform, Vec3)> {
        self.inner.debug_shapes()
    }

    fn body_count(&self) -> usize {
        self.inner.body_count()
    }
}

/// A visual that counts its releases.
struct Marker {
    releases: Rc<RefCell<u32>>,
}

impl Component for Marker {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from(Capability::Visual)
    }

    fn as_visual(&self) -> Option<&dyn Visual> {
        Some(self)
    }

    fn as_visual_mut(&mut self) -> Option<&mut dyn Visual> {
        Some(self)
    }
}

impl Visual for Marker {
    fn render(&self, _renderer: &mut dyn Renderer) {}

    fn release(&mut self) {
        *self.releases.borrow_mut() += 1;
    }
}

fn model(id: u64) -> Model {
    Model {
        mesh: MeshHandle(id),
        vertex_count: 36,
    }
}

fn duck(world: &mut World, z: f32) -> Entity {
    let duck = Entity::compound();
    let body = BodyDesc::dynamic_box(Vec3::splat(0.5)).at(Vec3::new(0.0, 0.0, z));
    duck.add(PhysicsComponent::new(body).with_visual_scale(0.0005));
    duck.add(ModelComponent::new(model(7)));
    world.add(&duck);
    duck
}

#[test]
fn removing_a_compound_entity_marks_components_and_untracks_it() {
    init_logging();
    let mut world = World::default();
    let e = duck(&mut world, 3.0);
    world.update(0.016);
    assert!(world.is_tracked(&e));

    e.remove();
    assert!(e.components().iter().all(ComponentRef::is_removed));

    world.update(0.016);
    assert!(!world.is_tracked(&e));
    world.update(0.016);
    assert!(world.tracked_entities().is_empty());
}

#[test]
fn simple_entities_are_routed_but_not_tracked() {
    init_logging();
    let mut world = World::default();
    let visual = ComponentRef::new(ModelComponent::new(model(1)));
    let simple = Entity::with_component(visual.clone());
    let compound = Entity::compound();

    world.add(&simple);
    world.add(&compound);

    assert_eq!(world.visual().len(), 1);
    assert_eq!(world.tracked_entities().len(), 1);
    assert!(world.is_tracked(&compound));
    assert!(!world.is_tracked(&simple));
}

#[test]
fn get_component_on_missing_capability_is_none() {
    let e = Entity::with_component(ComponentRef::new(ModelComponent::new(model(1))));
    assert!(e.get_component(Capability::Physics).is_none());
    assert!(e.get_component(Capability::Time).is_none());
}

#[test]
fn eviction_releases_exactly_the_removed_components_once() {
    init_logging();
    let mut world = World::default();
    let releases = Rc::new(RefCell::new(0));
    let entities: Vec<_> = (0..5)
        .map(|_| {
            let e = Entity::with_component(ComponentRef::new(Marker {
                releases: Rc::clone(&releases),
            }));
            world.add(&e);
            e
        })
        .collect();

    entities[1].remove();
    entities[3].remove();
    world.update(0.016);
    let mut renderer = DrawRecorder::new();
    world.draw(&mut renderer);

    assert_eq!(world.visual().len(), 3);
    assert_eq!(*releases.borrow(), 2);

    world.update(0.016);
    world.draw(&mut renderer);
    assert_eq!(*releases.borrow(), 2);
}

#[test]
fn noon_plus_six_hours_is_three_quarters_of_a_day() {
    let config =
        WorldConfig::from_json_str(r#"{ "time": { "seconds_per_day": 86400, "offset": 43200 } }"#)
            .unwrap();
    let mut world = World::new(&config);
    world.update(21_600.0);
    assert!((world.clock().days() - 0.75).abs() < 1e-12);
}

#[test]
fn body_removed_before_first_update_is_released_once() {
    init_logging();
    let (backend, counts) = CountingBackend::new();
    let mut world = World::with_backend(&WorldConfig::default(), Box::new(backend));

    let e = duck(&mut world, 1.0);
    let handle = e
        .get::<PhysicsComponent>()
        .and_then(|c| c.downcast_ref::<PhysicsComponent>().and_then(|p| p.handle()))
        .unwrap();
    e.remove();

    world.update(0.016);
    world.update(0.016);

    let counts = counts.borrow();
    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.removed, vec![handle]);
    assert_eq!(counts.steps, 2);
    assert_eq!(world.physics().backend().body_count(), 0);
}

#[test]
fn model_is_drawn_where_its_body_is() {
    let mut world = World::default();
    duck(&mut world, 4.0);
    world.update(0.016);

    let mut renderer = DrawRecorder::new();
    world.draw(&mut renderer);

    let transform = renderer
        .commands()
        .iter()
        .find_map(|c| match c {
            DrawCommand::Mesh { transform, .. } => Some(*transform),
            _ => None,
        })
        .unwrap();
    assert_eq!(transform.translation, Vec3::new(0.0, 0.0, 4.0));
    assert_eq!(transform.scale, Vec3::splat(0.0005));
}

#[test]
fn sun_lights_the_frame_and_follows_the_clock() {
    let config = WorldConfig::from_json_str(r#"{ "sun": { "latitude": 0, "tilt": 0 } }"#).unwrap();
    let mut world = World::new(&config);
    let sun = ComponentRef::new(SunComponent::from_config(&config.sun));
    world.add(&Entity::with_component(sun));

    let mut renderer = DrawRecorder::new();
    world.update(0.0);
    world.draw(&mut renderer);
    assert!((renderer.sun().unwrap() - Vec3::NEG_Z).length() < 1e-5);

    world.update(43_200.0);
    world.draw(&mut renderer);
    assert!((renderer.sun().unwrap() - Vec3::Z).length() < 1e-5);
}

#[test]
fn ground_is_debug_drawn_when_configured() {
    let config = WorldConfig::from_json_str(
        r#"{ "physics": { "ground": [50, 50, 0.5], "debug_draw": true } }"#,
    )
    .unwrap();
    let mut world = World::new(&config);
    duck(&mut world, 2.0);

    let mut renderer = DrawRecorder::new();
    world.draw(&mut renderer);
    assert_eq!(renderer.debug_box_count(), 2);
}

#[test]
#[should_panic(expected = "after it was linked")]
fn appending_after_add_panics() {
    let mut world = World::default();
    let e = Entity::compound();
    world.add(&e);
    e.add(ModelComponent::new(model(1)));
}

/// Records what its entity's time and body look like when behaviors run.
struct Witness {
    seen_time: Rc<Cell<f64>>,
    seen_height: Rc<Cell<f32>>,
}

impl Component for Witness {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from(Capability::Behavior)
    }

    fn as_behavior_mut(&mut self) -> Option<&mut dyn Behavior> {
        Some(self)
    }
}

impl Behavior for Witness {
    fn on_update(&mut self, _dt: f64, entity: &Entity) {
        if let Some(time) = entity.get::<TimeComponent>() {
            let time = time.downcast_ref::<TimeComponent>().map_or(-1.0, |t| t.time());
            self.seen_time.set(time);
        }
        if let Some(body) = entity.get::<PhysicsComponent>() {
            let z = body
                .downcast_ref::<PhysicsComponent>()
                .map_or(f32::NAN, |b| b.pose().translation.z);
            self.seen_height.set(z);
        }
    }
}

/// Lifts every body by one meter per simulated second.
#[derive(Default)]
struct Elevator {
    inner: NullBackend,
    elapsed: f32,
}

impl PhysicsBackend for Elevator {
    fn insert_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.inner.insert_body(desc)
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.inner.remove_body(handle);
    }

    fn step(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    fn pose(&self, handle: BodyHandle) -> Option<Transform> {
        let mut pose = self.inner.pose(handle)?;
        pose.translation.z += self.elapsed;
        Some(pose)
    }

    fn debug_shapes(&self) -> Vec<(Transform, Vec3)> {
        self.inner.debug_shapes()
    }

    fn body_count(&self) -> usize {
        self.inner.body_count()
    }
}

fn witnessed(world: &mut World) -> (Rc<Cell<f64>>, Rc<Cell<f32>>) {
    let seen_time = Rc::new(Cell::new(0.0));
    let seen_height = Rc::new(Cell::new(0.0));
    let e = Entity::compound();
    e.add(TimeComponent::new());
    e.add(PhysicsComponent::new(
        BodyDesc::dynamic_box(Vec3::splat(0.5)).at(Vec3::new(0.0, 0.0, 2.0)),
    ));
    e.add(Witness {
        seen_time: Rc::clone(&seen_time),
        seen_height: Rc::clone(&seen_height),
    });
    world.add(&e);
    (seen_time, seen_height)
}

#[test]
fn behaviors_see_the_clock_advanced_this_tick() {
    init_logging();
    let mut world = World::default();
    let (seen_time, _) = witnessed(&mut world);

    world.update(5.0);
    assert_eq!(seen_time.get(), 5.0);

    world.update(1.0);
    assert_eq!(seen_time.get(), 6.0);
}

#[test]
fn behaviors_see_the_pose_synced_this_tick() {
    init_logging();
    let mut world = World::with_backend(&WorldConfig::default(), Box::new(Elevator::default()));
    let (_, seen_height) = witnessed(&mut world);

    world.update(0.5);
    assert!((seen_height.get() - 2.5).abs() < 1e-6);
}
