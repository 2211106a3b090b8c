//! # System — Owner of All Live Components of One Capability
//!
//! Each system keeps its registered components in a [`ComponentSet`], an
//! arena of slots with stable keys. Removal is never forced on a system from
//! the outside: an entity only flips the component's `removed` flag, and the
//! system notices during its own next pass.
//!
//! ## Eviction
//!
//! ```text
//! pass N:    [A] [B*] [C] [D*]      * = removed flag set
//!             │   │    │   │
//!             │   └─ release(B), free slot
//!             │        │   └─ release(D), free slot
//! pass N+1:  [A] [ ]  [C] [ ]       keys of A and C unchanged
//! ```
//!
//! The sweep is a single `retain` over the slot map, so entries flagged in the
//! middle of a pass are neither skipped nor visited twice, and each removed
//! entry is released exactly once: its slot is gone afterwards.

use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

use super::capability::Capability;
use super::component::{ComponentId, ComponentRef};
use crate::render::Renderer;

new_key_type! {
    /// Stable key of a component inside one [`ComponentSet`].
    pub struct SlotKey;
}

/// Live components of one system.
#[derive(Default)]
pub struct ComponentSet {
    slots: SlotMap<SlotKey, ComponentRef>,
    index: HashMap<ComponentId, SlotKey>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component.
    ///
    /// # Panics
    ///
    /// Panics if the component is already registered in this set.
    pub fn insert(&mut self, component: ComponentRef) -> SlotKey {
        let id = component.id();
        assert!(
            !self.index.contains_key(&id),
            "component {id:?} is already registered in this system"
        );
        let key = self.slots.insert(component);
        self.index.insert(id, key);
        key
    }

    /// Drop every entry whose removed flag is set, calling `release` once for
    /// each before it leaves the set. Returns the number evicted.
    pub fn evict(&mut self, mut release: impl FnMut(&ComponentRef)) -> usize {
        let index = &mut self.index;
        let before = self.slots.len();
        self.slots.retain(|_, component| {
            if component.is_removed() {
                release(component);
                index.remove(&component.id());
                false
            } else {
                true
            }
        });
        before - self.slots.len()
    }

    pub fn get(&self, key: SlotKey) -> Option<&ComponentRef> {
        self.slots.get(key)
    }

    pub fn contains(&self, component: &ComponentRef) -> bool {
        self.index.contains_key(&component.id())
    }

    /// All registered entries, including ones flagged but not yet evicted.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRef> {
        self.slots.values()
    }

    /// Registered entries whose removed flag is still clear.
    pub fn live(&self) -> impl Iterator<Item = &ComponentRef> {
        self.slots.values().filter(|c| !c.is_removed())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A per-capability system driven by the [`World`](super::World).
///
/// `update` and `draw` default to no-ops; `add` must be safe to call exactly
/// once per component.
pub trait System {
    /// Short name for logs and timings.
    fn name(&self) -> &'static str;

    /// The capability whose components this system manages.
    fn capability(&self) -> Capability;

    /// Register a component declaring [`capability`](System::capability).
    fn add(&mut self, component: ComponentRef);

    /// Advance by `dt` simulated seconds.
    fn update(&mut self, _dt: f64) {}

    /// Emit this system's rendering side effects.
    fn draw(&mut self, _renderer: &mut dyn Renderer) {}

    /// Number of registered components, including removed ones not yet
    /// evicted.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-system timing recorded during a single [`World::update`](super::World::update).
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: &'static str,
    pub duration_us: f64,
}
