//! # Entity — An Owned, Ordered Bag of Components
//!
//! An entity is a sealed aggregate: it has no behavior of its own beyond the
//! lifecycle state machine below. Anything an entity "does" is done by its
//! components, either through the systems they are registered in or, for
//! per-tick orchestration, through `Behavior`-capability components invoked by
//! [`Entity::update`].
//!
//! ## Lifecycle
//!
//! ```text
//!            link_component / build
//!               ┌────────┐
//!               ▼        │
//!          ┌──────────┐──┘   link()    ┌────────┐   remove()   ┌─────────┐
//!  new ──► │ Building │ ─────────────► │ Linked │ ───────────► │ Removed │
//!          └──────────┘                 └────────┘              └─────────┘
//!                │              remove()                           ▲
//!                └─────────────────────────────────────────────────┘
//! ```
//!
//! - Components can only be appended while `Building`. After `link()` the set
//!   is frozen; it can only shrink by components being marked removed.
//! - `link()` runs every component's `on_link` hook exactly once.
//! - `remove()` marks the entity and then every component, in insertion
//!   order, running each component's `on_remove` hook exactly once.
//!
//! ## Simple vs. compound
//!
//! A *simple* entity is built from a fixed list of components and linked on
//! the spot. It has no per-tick behavior, so the [`World`](super::World)
//! routes its components and then forgets it. A *compound* entity is built
//! incrementally and is tracked by the world so its behaviors run each tick
//! and its removal is observed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::capability::Capability;
use super::component::{Component, ComponentRef};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique entity identifier, mostly useful for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Lifecycle state of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Building,
    Linked,
    Removed,
}

/// Whether an entity needs entity-level ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Simple,
    Compound,
}

pub(crate) struct EntityInner {
    id: EntityId,
    kind: EntityKind,
    state: Cell<EntityState>,
    components: RefCell<Vec<ComponentRef>>,
}

/// Shared handle to an entity.
///
/// The caller that built the entity and the world that tracks it hold clones
/// of the same handle, so the caller can remove it later.
#[derive(Clone)]
pub struct Entity(Rc<EntityInner>);

impl Entity {
    fn with_kind(kind: EntityKind) -> Self {
        Self(Rc::new(EntityInner {
            id: EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            state: Cell::new(EntityState::Building),
            components: RefCell::new(Vec::new()),
        }))
    }

    pub(crate) fn from_inner(inner: Rc<EntityInner>) -> Self {
        Self(inner)
    }

    /// Create a simple entity holding `components`. The entity is linked
    /// immediately.
    ///
    /// The world never tracks simple entities, so `Behavior` components
    /// given here are never ticked. Use [`Entity::compound`] for those.
    ///
    /// # Panics
    ///
    /// Panics if any component already belongs to another entity.
    pub fn with_components(components: impl IntoIterator<Item = ComponentRef>) -> Self {
        let entity = Self::with_kind(EntityKind::Simple);
        entity.build(components);
        let idle = entity
            .0
            .components
            .borrow()
            .iter()
            .filter(|c| c.has(Capability::Behavior))
            .count();
        if idle > 0 {
            log::warn!(
                "simple entity {} has {idle} behavior(s) that will never be updated",
                entity.id()
            );
        }
        entity.link();
        entity
    }

    /// Create a simple entity holding a single component.
    pub fn with_component(component: ComponentRef) -> Self {
        Self::with_components([component])
    }

    /// Create an empty compound entity in the `Building` state.
    pub fn compound() -> Self {
        Self::with_kind(EntityKind::Compound)
    }

    /// Append a component.
    ///
    /// # Panics
    ///
    /// Panics if the entity is no longer `Building`, or if the component
    /// already belongs to an entity.
    pub fn link_component(&self, component: ComponentRef) {
        assert_eq!(
            self.state(),
            EntityState::Building,
            "cannot add a component to entity {} after it was linked",
            self.id()
        );
        assert!(
            !component.has_owner(),
            "component {:?} already belongs to an entity",
            component.id()
        );
        component.set_owner(Rc::downgrade(&self.0));
        self.0.components.borrow_mut().push(component);
    }

    /// Append several components, in order. Same rules as
    /// [`link_component`](Self::link_component).
    pub fn build(&self, components: impl IntoIterator<Item = ComponentRef>) {
        for component in components {
            self.link_component(component);
        }
    }

    /// Wrap `component` and append it, returning its handle.
    pub fn add<C: Component>(&self, component: C) -> ComponentRef {
        let handle = ComponentRef::new(component);
        self.link_component(handle.clone());
        handle
    }

    /// Seal the component set and run every component's `on_link` hook.
    ///
    /// Calling this on an entity that is already linked (or removed) does
    /// nothing.
    pub fn link(&self) {
        if self.state() != EntityState::Building {
            return;
        }
        self.0.state.set(EntityState::Linked);
        log::debug!(
            "entity {} linked with {} component(s)",
            self.id(),
            self.component_count()
        );

        for component in self.components() {
            // An earlier hook may have removed the entity.
            if component.is_removed() {
                continue;
            }
            component.borrow_mut().on_link(self);
            component.finish_deferred_dispose(self);
        }
    }

    /// Remove the entity and cascade to every component it owns.
    ///
    /// Idempotent: only the first call has any effect.
    pub fn remove(&self) {
        if self.is_removed() {
            return;
        }
        self.0.state.set(EntityState::Removed);
        log::debug!("entity {} removed", self.id());

        for component in self.components() {
            if component.mark_removed() {
                component.dispose(self);
            }
        }
    }

    /// Remove one owned component without removing the entity.
    ///
    /// # Panics
    ///
    /// Panics if `component` is not owned by this entity.
    pub fn remove_component(&self, component: &ComponentRef) {
        assert!(
            self.0.components.borrow().iter().any(|c| c.ptr_eq(component)),
            "component {:?} is not owned by entity {}",
            component.id(),
            self.id()
        );
        if component.mark_removed() {
            component.dispose(self);
        }
    }

    /// Run the per-tick hook: every live `Behavior` component, in insertion
    /// order.
    pub fn update(&self, dt: f64) {
        for component in self.components() {
            if component.is_removed() || !component.has(Capability::Behavior) {
                continue;
            }
            if let Some(behavior) = component.borrow_mut().as_behavior_mut() {
                behavior.on_update(dt, self);
            }
            component.finish_deferred_dispose(self);
        }
    }

    /// The first live component declaring `capability`, if any.
    pub fn get_component(&self, capability: Capability) -> Option<ComponentRef> {
        self.0
            .components
            .borrow()
            .iter()
            .find(|c| !c.is_removed() && c.has(capability))
            .cloned()
    }

    /// The first live component of concrete type `T`, if any.
    pub fn get<T: Component>(&self) -> Option<ComponentRef> {
        self.0
            .components
            .borrow()
            .iter()
            .find(|c| !c.is_removed() && c.is::<T>())
            .cloned()
    }

    /// Snapshot of the owned components, in insertion order.
    pub fn components(&self) -> Vec<ComponentRef> {
        self.0.components.borrow().clone()
    }

    pub fn component_count(&self) -> usize {
        self.0.components.borrow().len()
    }

    pub fn id(&self) -> EntityId {
        self.0.id
    }

    pub fn state(&self) -> EntityState {
        self.0.state.get()
    }

    pub fn kind(&self) -> EntityKind {
        self.0.kind
    }

    pub fn is_simple(&self) -> bool {
        self.0.kind == EntityKind::Simple
    }

    pub fn is_removed(&self) -> bool {
        self.state() == EntityState::Removed
    }

    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity(Rc::downgrade(&self.0))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("components", &self.component_count())
            .finish()
    }
}

/// Non-owning entity handle.
#[derive(Clone, Default)]
pub struct WeakEntity(Weak<EntityInner>);

impl WeakEntity {
    pub fn upgrade(&self) -> Option<Entity> {
        self.0.upgrade().map(Entity)
    }
}
