//! # Capability-Routed ECS
//!
//! Entities are sealed bags of components; systems own every live component
//! of one capability; the world routes components to systems and drives the
//! tick.
//!
//! ## Module Overview
//!
//! - [`capability`] — Capability tags and the bit set components declare
//! - [`component`] — Component contract and the shared `ComponentRef` handle
//! - [`entity`] — Entity lifecycle (Building → Linked → Removed)
//! - [`system`] — System trait and the slot-map `ComponentSet` with eviction
//! - [`world`] — Routing, tracked entities and the update/draw tick
//!
//! ## Comparison
//!
//! - **bevy_ecs / hecs**: components are plain data in archetype tables and
//!   systems are functions over queries. Removal is immediate.
//! - **here**: components are objects shared between their entity and their
//!   systems, and removal is a flag the owning system acts on during its next
//!   pass. That keeps external resources (physics bodies, GPU meshes) owned by
//!   exactly one releaser.

pub mod capability;
pub mod component;
pub mod entity;
pub mod system;
pub mod world;

pub use capability::{Capabilities, Capability};
pub use component::{AsAny, Behavior, Component, ComponentId, ComponentRef, WeakComponentRef};
pub use entity::{Entity, EntityId, EntityKind, EntityState, WeakEntity};
pub use system::{ComponentSet, SlotKey, System};
#[cfg(feature = "diagnostics")]
pub use system::SystemTiming;
pub use world::{SYSTEM_ORDER, World};
