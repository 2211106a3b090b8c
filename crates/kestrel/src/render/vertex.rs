//! # Vertex — Per-Corner Data Handed to the Graphics Backend
//!
//! Meshes are flattened into a plain triangle list: every three vertices form
//! one triangle, no index buffer. The layout is fixed so a backend can upload
//! the slice as raw bytes.
//!
//! ```text
//! Vertex (48 bytes)
//! ┌────────────────┬────────────────┬──────────────┬────────────────────────┐
//! │ position       │ normal         │ uv           │ color                  │
//! │ [f32; 3]       │ [f32; 3]       │ [f32; 2]     │ [f32; 4]               │
//! │ offset 0       │ offset 12      │ offset 24    │ offset 32              │
//! └────────────────┴────────────────┴──────────────┴────────────────────────┘
//! ```
//!
//! `#[repr(C)]` pins the field order, and the `bytemuck` traits let the slice
//! be reinterpreted as `&[u8]` without copying.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    /// Distance in bytes between consecutive vertices.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    /// Byte offsets of position, normal, uv and color.
    pub const OFFSETS: [usize; 4] = [0, 12, 24, 32];

    /// A white vertex at `position` with the given normal and uv.
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            color: [1.0; 4],
        }
    }
}

/// View a vertex slice as bytes for upload.
pub fn as_bytes(vertices: &[Vertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
