//! Convenience re-exports — `use kestrel::prelude::*` for the common items.

pub use crate::asset::{AssetCache, MeshUploader, Model};
pub use crate::config::{PhysicsConfig, SunConfig, TimeConfig, WorldConfig};
pub use crate::ecs::{
    Behavior, Capabilities, Capability, Component, ComponentRef, Entity, EntityState, System,
    World,
};
pub use crate::error::{AssetError, ConfigError};
pub use crate::math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::physics::{BodyDesc, BodyHandle, BodyKind, NullBackend, PhysicsBackend, PhysicsComponent};
#[cfg(feature = "physics3d")]
pub use crate::physics::RapierBackend;
pub use crate::render::{Color, DrawRecorder, MeshHandle, Renderer, Vertex};
pub use crate::sun::SunComponent;
pub use crate::time::{Clock, FrameClock, TimeComponent};
pub use crate::visual::{ModelComponent, Visual};
