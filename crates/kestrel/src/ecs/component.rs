//! # Component — The Smallest Behavioral Unit
//!
//! A component is a piece of an [`Entity`] that some system knows how to
//! drive. Components are shared between their owning entity (which decides
//! *when* they die) and the systems they are registered in (which decide
//! *when the death is acted on*). That shared ownership is expressed with a
//! reference-counted [`ComponentRef`] handle:
//!
//! ```text
//! ComponentRef ──► Rc<ComponentCell>
//!                  ├─ capabilities   fixed at construction
//!                  ├─ removed        Cell<bool>, write-once true
//!                  ├─ owner          Weak<entity>, lookup only
//!                  └─ inner          RefCell<Box<dyn Component>>
//! ```
//!
//! The `removed` flag lives outside the `RefCell` so systems can test it
//! without borrowing the component, even while a hook is running.
//!
//! ## Capability views
//!
//! The contracts owned by this module and the render contract have typed
//! accessors ([`Component::transform`], [`Component::as_visual`],
//! [`Component::as_behavior_mut`]). State that belongs to a concrete system
//! is reached through [`Component::view_mut`], which the system downcasts to
//! its own type. By default the view is the component itself, so a plain
//! `PhysicsComponent` needs no override; a wrapper that embeds one returns
//! the embedded value instead. A component that declares a tag but has no
//! matching view is a usage fault caught at registration.

use std::any::{Any, TypeId};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use super::capability::{Capabilities, Capability};
use super::entity::{Entity, EntityInner};
use crate::math::Transform;
use crate::render::Visual;

/// Object-safe access to [`Any`] for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-tick logic that needs to look at several components of one entity.
///
/// Invoked by [`Entity::update`] during the world's entity sweep. A behavior
/// may read and write its own entity's components but must never reach into
/// other entities.
pub trait Behavior {
    fn on_update(&mut self, dt: f64, entity: &Entity);
}

/// The lifecycle contract every component implements.
///
/// Only [`capabilities`](Component::capabilities) is required. Everything else
/// defaults to a no-op or "not provided".
pub trait Component: AsAny {
    /// The capability tags this component serves. Read once, when the
    /// component is wrapped in a [`ComponentRef`].
    fn capabilities(&self) -> Capabilities;

    /// Called when the owning entity transitions Building → Linked. This is
    /// the place to discover sibling components.
    fn on_link(&mut self, _entity: &Entity) {}

    /// Called exactly once when the component is removed, either directly or
    /// as part of its entity's removal.
    fn on_remove(&mut self, _entity: &Entity) {}

    /// Current transform, for `Transform`-capability components.
    fn transform(&self) -> Option<Transform> {
        None
    }

    fn as_visual(&self) -> Option<&dyn Visual> {
        None
    }

    fn as_visual_mut(&mut self) -> Option<&mut dyn Visual> {
        None
    }

    /// The value the system managing `capability` drives, for that system
    /// to downcast. Defaults to the component itself.
    fn view_mut(&mut self, _capability: Capability) -> Option<&mut dyn Any> {
        Some(self.as_any_mut())
    }

    fn as_behavior_mut(&mut self) -> Option<&mut dyn Behavior> {
        None
    }
}

/// Identity of a component, stable while any handle to it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

struct ComponentCell {
    capabilities: Capabilities,
    type_id: TypeId,
    removed: Cell<bool>,
    dispose_deferred: Cell<bool>,
    owner: RefCell<Weak<EntityInner>>,
    inner: RefCell<Box<dyn Component>>,
}

/// Shared handle to a component.
///
/// Cloning the handle does not clone the component. The entity that owns the
/// component and every system it is registered in hold clones of the same
/// handle.
#[derive(Clone)]
pub struct ComponentRef(Rc<ComponentCell>);

impl ComponentRef {
    /// Wrap a component. Its capability set is captured here and never
    /// changes afterwards.
    pub fn new<C: Component>(component: C) -> Self {
        let capabilities = component.capabilities();
        Self(Rc::new(ComponentCell {
            capabilities,
            type_id: TypeId::of::<C>(),
            removed: Cell::new(false),
            dispose_deferred: Cell::new(false),
            owner: RefCell::new(Weak::new()),
            inner: RefCell::new(Box::new(component)),
        }))
    }

    pub fn id(&self) -> ComponentId {
        ComponentId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.0.capabilities
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.0.capabilities.contains(capability)
    }

    /// `true` once the component has been removed. Never goes back to `false`.
    pub fn is_removed(&self) -> bool {
        self.0.removed.get()
    }

    /// Set the removed flag. Returns `true` only for the call that actually
    /// flipped it, so callers can run disposal exactly once.
    pub(crate) fn mark_removed(&self) -> bool {
        !self.0.removed.replace(true)
    }

    /// Run `on_remove`. If the component is busy in one of its own hooks
    /// (a behavior removing its own entity), the call is deferred until
    /// [`finish_deferred_dispose`](Self::finish_deferred_dispose).
    pub(crate) fn dispose(&self, entity: &Entity) {
        match self.0.inner.try_borrow_mut() {
            Ok(mut inner) => inner.on_remove(entity),
            Err(_) => self.0.dispose_deferred.set(true),
        }
    }

    /// Run an `on_remove` deferred by [`dispose`](Self::dispose). Called
    /// right after a hook releases its borrow.
    pub(crate) fn finish_deferred_dispose(&self, entity: &Entity) {
        if self.0.dispose_deferred.replace(false) {
            self.borrow_mut().on_remove(entity);
        }
    }

    /// The entity this component was linked into, if it is still alive.
    pub fn owner(&self) -> Option<Entity> {
        self.0.owner.borrow().upgrade().map(Entity::from_inner)
    }

    pub(crate) fn has_owner(&self) -> bool {
        self.0.owner.borrow().strong_count() > 0
    }

    pub(crate) fn set_owner(&self, owner: Weak<EntityInner>) {
        *self.0.owner.borrow_mut() = owner;
    }

    /// Borrow the component.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently mutably borrowed (for example,
    /// from inside one of its own hooks).
    pub fn borrow(&self) -> Ref<'_, dyn Component + 'static> {
        Ref::map(self.0.inner.borrow(), |c| &**c)
    }

    /// Mutably borrow the component.
    ///
    /// # Panics
    ///
    /// Panics if the component is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Component + 'static> {
        RefMut::map(self.0.inner.borrow_mut(), |c| &mut **c)
    }

    /// Borrow the component as its concrete type, if it is a `T`.
    pub fn downcast_ref<T: Component>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.inner.borrow(), |c| (**c).as_any().downcast_ref::<T>()).ok()
    }

    /// Mutably borrow the component as its concrete type, if it is a `T`.
    pub fn downcast_mut<T: Component>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.inner.borrow_mut(), |c| {
            (**c).as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// `true` if the component is a `T`. Does not borrow the component, so
    /// it is safe to call from inside another component's hook.
    pub fn is<T: Component>(&self) -> bool {
        self.0.type_id == TypeId::of::<T>()
    }

    pub fn ptr_eq(&self, other: &ComponentRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A non-owning handle, for sibling references that must not keep the
    /// component alive.
    pub fn downgrade(&self) -> WeakComponentRef {
        WeakComponentRef(Rc::downgrade(&self.0))
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("id", &self.id())
            .field("capabilities", &self.0.capabilities)
            .field("removed", &self.is_removed())
            .finish()
    }
}

/// Weak counterpart of [`ComponentRef`].
#[derive(Clone, Default)]
pub struct WeakComponentRef(Weak<ComponentCell>);

impl WeakComponentRef {
    pub fn upgrade(&self) -> Option<ComponentRef> {
        self.0.upgrade().map(ComponentRef)
    }
}

impl fmt::Debug for WeakComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakComponentRef(alive: {})", self.0.strong_count() > 0)
    }
}
