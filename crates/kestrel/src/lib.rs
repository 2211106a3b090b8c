//! # Kestrel — Capability-Routed Simulation Runtime
//!
//! A small runtime that assembles scenes out of entities and components and
//! drives them through a synchronous, single-threaded update/draw cycle.
//! Rendering, the rigid-body solver and GPU upload sit behind traits
//! ([`Renderer`](render::Renderer), [`PhysicsBackend`](physics::PhysicsBackend),
//! [`MeshUploader`](asset::MeshUploader)) so the core never links a graphics
//! stack.
//!
//! ```text
//! frame loop ──► World::update(dt) ──► visual ─► time ─► physics ─► entity sweep
//!            └─► World::draw(r)    ──► visual ─► time ─► physics
//! ```
//!
//! Start with `use kestrel::prelude::*`, build entities, [`World::add`](ecs::World::add)
//! them and call `update`/`draw` once per frame.

pub mod asset;
pub mod config;
pub mod ecs;
pub mod error;
pub mod math;
pub mod physics;
pub mod prelude;
pub mod render;
pub mod sun;
pub mod time;
pub mod visual;

pub use error::{Error, Result};
