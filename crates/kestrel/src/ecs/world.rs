//! # World — Systems, Tracked Entities and the Frame Tick
//!
//! The [`World`] owns one system per system-backed capability and the list
//! of compound entities that need per-tick behavior.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ World                                                    │
//! │                                                          │
//! │  visual:  VisualSystem    ◄── Visual components          │
//! │  time:    TimeSystem      ◄── Time components            │
//! │  physics: PhysicsSystem   ◄── Physics components         │
//! │                                                          │
//! │  entities: Vec<Entity>    compound entities only         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routing
//!
//! `add(entity)` hands each component to every system whose capability the
//! component declares, so one component can land in several systems.
//! `Transform` and `Behavior` are contracts between siblings and have no
//! system. Simple entities are forgotten once routed; compound ones are
//! kept so their behaviors run and their removal is observed.
//!
//! ## Tick order
//!
//! ```text
//! update(dt):  visual ─► time ─► physics ─► entity sweep
//! draw(r):     begin_frame ─► visual ─► time ─► physics ─► end_frame
//! ```
//!
//! The order never changes. Anything a system produces during `update` is
//! visible to the systems after it and to the entity sweep.

use super::capability::Capability;
use super::entity::Entity;
use super::system::System;
#[cfg(feature = "diagnostics")]
use super::system::SystemTiming;
use crate::config::WorldConfig;
use crate::physics::{NullBackend, PhysicsBackend, PhysicsSystem};
use crate::render::Renderer;
use crate::time::{Clock, TimeSystem};
use crate::visual::VisualSystem;

/// The fixed order in which systems are updated and drawn.
pub const SYSTEM_ORDER: [Capability; 3] = [Capability::Visual, Capability::Time, Capability::Physics];

/// The simulation root.
pub struct World {
    visual: VisualSystem,
    time: TimeSystem,
    physics: PhysicsSystem,
    entities: Vec<Entity>,
    /// Per-system timings from the most recent `update()` call.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl World {
    /// A world whose physics never moves anything.
    pub fn new(config: &WorldConfig) -> Self {
        Self::with_backend(config, Box::new(NullBackend::new()))
    }

    pub fn with_backend(config: &WorldConfig, backend: Box<dyn PhysicsBackend>) -> Self {
        Self {
            visual: VisualSystem::new(),
            time: TimeSystem::new(&config.time),
            physics: PhysicsSystem::new(&config.physics, backend),
            entities: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Route an entity's components to their systems and track it if it is
    /// compound.
    ///
    /// An entity still being built is linked first. A removed entity is
    /// ignored.
    ///
    /// # Panics
    ///
    /// Panics if the entity is already in the world. For a simple entity
    /// this shows up as one of its components being registered twice.
    pub fn add(&mut self, entity: &Entity) {
        if entity.is_removed() {
            log::warn!("ignoring removed entity {}", entity.id());
            return;
        }
        assert!(
            !self.is_tracked(entity),
            "entity {} is already in the world",
            entity.id()
        );
        entity.link();

        let mut routed = 0;
        for component in entity.components() {
            if component.is_removed() {
                continue;
            }
            for system in self.systems_mut() {
                if component.has(system.capability()) {
                    system.add(component.clone());
                    routed += 1;
                }
            }
        }

        if entity.is_simple() {
            log::debug!("world: simple entity {} routed {routed} registration(s)", entity.id());
        } else {
            log::debug!("world: tracking entity {} ({routed} registration(s))", entity.id());
            self.entities.push(entity.clone());
        }
    }

    /// Advance every system by `dt` seconds, then sweep tracked entities.
    pub fn update(&mut self, dt: f64) {
        #[cfg(feature = "diagnostics")]
        {
            let mut timings = std::mem::take(&mut self.timings);
            timings.clear();
            for system in self.systems_mut() {
                let start = std::time::Instant::now();
                system.update(dt);
                timings.push(SystemTiming {
                    name: system.name(),
                    duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
                });
            }
            self.timings = timings;
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for system in self.systems_mut() {
                system.update(dt);
            }
        }

        self.entities.retain(|entity| {
            if entity.is_removed() {
                log::debug!("world: dropped removed entity {}", entity.id());
                false
            } else {
                entity.update(dt);
                true
            }
        });
    }

    /// Emit one frame to `renderer`.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        renderer.begin_frame();
        for system in self.systems_mut() {
            system.draw(renderer);
        }
        renderer.end_frame();
    }

    fn systems_mut(&mut self) -> [&mut dyn System; 3] {
        [&mut self.visual, &mut self.time, &mut self.physics]
    }

    /// The system managing `capability`.
    ///
    /// # Panics
    ///
    /// Panics for `Transform` and `Behavior`, which no system manages.
    pub fn system(&self, capability: Capability) -> &dyn System {
        match capability {
            Capability::Visual => &self.visual,
            Capability::Time => &self.time,
            Capability::Physics => &self.physics,
            Capability::Transform | Capability::Behavior => {
                panic!("no system manages the {capability:?} capability")
            }
        }
    }

    pub fn visual(&self) -> &VisualSystem {
        &self.visual
    }

    pub fn time(&self) -> &TimeSystem {
        &self.time
    }

    pub fn physics(&self) -> &PhysicsSystem {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsSystem {
        &mut self.physics
    }

    /// The simulated clock shared with every `Time` component.
    pub fn clock(&self) -> &Clock {
        self.time.clock()
    }

    /// Compound entities currently tracked, in insertion order.
    pub fn tracked_entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn is_tracked(&self, entity: &Entity) -> bool {
        self.entities.iter().any(|e| e.ptr_eq(entity))
    }

    /// Per-system timings from the most recent [`update`](Self::update).
    #[cfg(feature = "diagnostics")]
    pub fn last_timings(&self) -> &[SystemTiming] {
        &self.timings
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Behavior, Capabilities, Component, ComponentRef};
    use crate::render::DrawRecorder;

    struct Tagged(Capabilities);

    impl Component for Tagged {
        fn capabilities(&self) -> Capabilities {
            self.0
        }
    }

    /// Counts its ticks and removes its own entity after `lifetime` of them.
    struct Countdown {
        lifetime: u32,
        ticks: u32,
    }

    impl Component for Countdown {
        fn capabilities(&self) -> Capabilities {
            Capabilities::from(Capability::Behavior)
        }

        fn as_behavior_mut(&mut self) -> Option<&mut dyn Behavior> {
            Some(self)
        }
    }

    impl Behavior for Countdown {
        fn on_update(&mut self, _dt: f64, entity: &Entity) {
            self.ticks += 1;
            if self.ticks == self.lifetime {
                entity.remove();
            }
        }
    }

    #[test]
    fn systems_run_in_declared_order() {
        let mut world = World::default();
        world.update(0.0);
        let names: Vec<_> = world.systems_mut().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["visual", "time", "physics"]);
        for (system, capability) in world.systems_mut().iter().zip(SYSTEM_ORDER) {
            assert_eq!(system.capability(), capability);
        }
    }

    #[test]
    fn building_entity_is_linked_on_add() {
        let mut world = World::default();
        let e = Entity::compound();
        e.add(Tagged(Capabilities::NONE));
        world.add(&e);
        assert_eq!(e.state(), crate::ecs::EntityState::Linked);
        assert!(world.is_tracked(&e));
    }

    #[test]
    fn removed_entity_is_ignored() {
        let mut world = World::default();
        let e = Entity::compound();
        e.remove();
        world.add(&e);
        assert!(world.tracked_entities().is_empty());
    }

    #[test]
    fn behavior_driven_self_removal_is_swept_next_tick() {
        let mut world = World::default();
        let e = Entity::compound();
        let countdown = e.add(Countdown { lifetime: 2, ticks: 0 });
        world.add(&e);

        world.update(0.1);
        world.update(0.1);
        assert!(e.is_removed());
        assert!(world.is_tracked(&e));

        world.update(0.1);
        assert!(!world.is_tracked(&e));
        assert_eq!(countdown.downcast_ref::<Countdown>().unwrap().ticks, 2);
    }

    #[test]
    #[should_panic(expected = "already in the world")]
    fn adding_an_empty_compound_twice_panics() {
        let mut world = World::default();
        let e = Entity::compound();
        world.add(&e);
        world.add(&e);
    }

    #[test]
    #[should_panic(expected = "already in the world")]
    fn adding_a_behavior_only_compound_twice_panics() {
        let mut world = World::default();
        let e = Entity::compound();
        e.add(Countdown { lifetime: 10, ticks: 0 });
        world.add(&e);
        world.add(&e);
    }

    #[test]
    fn readded_compound_ticks_once_per_update() {
        let mut world = World::default();
        let e = Entity::compound();
        let countdown = e.add(Countdown { lifetime: 10, ticks: 0 });
        world.add(&e);
        let again = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| world.add(&e)));
        assert!(again.is_err());

        world.update(0.1);
        assert_eq!(world.tracked_entities().len(), 1);
        assert_eq!(countdown.downcast_ref::<Countdown>().unwrap().ticks, 1);
    }

    #[test]
    fn simple_entity_behaviors_are_not_ticked() {
        let mut world = World::default();
        let countdown = ComponentRef::new(Countdown { lifetime: 1, ticks: 0 });
        let e = Entity::with_component(countdown.clone());
        world.add(&e);
        world.update(0.1);
        assert!(!world.is_tracked(&e));
        assert!(!e.is_removed());
        assert_eq!(countdown.downcast_ref::<Countdown>().unwrap().ticks, 0);
    }

    #[test]
    fn transform_only_components_reach_no_system() {
        let mut world = World::default();
        let c = ComponentRef::new(Tagged(Capabilities::from(Capability::Transform)));
        world.add(&Entity::with_component(c));
        assert!(world.visual().is_empty());
        assert!(world.time().is_empty());
        assert!(world.physics().is_empty());
    }

    #[test]
    fn draw_brackets_the_frame() {
        let mut world = World::default();
        let mut recorder = DrawRecorder::new();
        world.draw(&mut recorder);
        world.draw(&mut recorder);
        assert_eq!(recorder.frames(), 2);
    }

    #[test]
    #[should_panic(expected = "no system manages")]
    fn behavior_has_no_system() {
        World::default().system(Capability::Behavior);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn update_records_one_timing_per_system() {
        let mut world = World::default();
        world.update(0.016);
        let timings = world.last_timings();
        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].name, "visual");
    }
}
