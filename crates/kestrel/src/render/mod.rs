//! Rendering contract.
//!
//! The runtime never talks to a GPU. Systems describe what to draw through
//! the [`Renderer`] trait and the graphics backend decides how. Drawables are
//! opaque [`MeshHandle`]s handed out by a
//! [`MeshUploader`](crate::asset::MeshUploader).
//!
//! [`DrawRecorder`] is a renderer that just records the calls; the headless
//! driver and the tests use it.

pub mod vertex;

pub use vertex::Vertex;

use crate::math::{Transform, Vec3};

/// Opaque drawable handle issued by the graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Linear RGBA color.
pub type Color = [f32; 4];

/// The graphics backend as seen from the simulation.
///
/// Called once per frame by [`World::draw`](crate::ecs::World::draw):
/// `begin_frame`, then any number of draws, then `end_frame`.
pub trait Renderer {
    fn begin_frame(&mut self) {}

    /// Direction *towards* the sun, used for lighting the rest of the frame.
    fn set_sun_direction(&mut self, _direction: Vec3) {}

    fn draw_mesh(&mut self, mesh: MeshHandle, vertex_count: u32, color: Color, transform: &Transform);

    /// Wireframe box for physics debug drawing.
    fn draw_debug_box(&mut self, _transform: &Transform, _half_extents: Vec3, _color: Color) {}

    fn end_frame(&mut self) {}
}

/// Drawing contract for Visual-capability components.
pub trait Visual {
    fn render(&self, renderer: &mut dyn Renderer);

    /// Release external resources. Called exactly once, when the visual
    /// system evicts the component.
    fn release(&mut self) {}

    /// Direction towards the light, for components that act as the sun.
    fn sun_direction(&self) -> Option<Vec3> {
        None
    }
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sun(Vec3),
    Mesh {
        mesh: MeshHandle,
        vertex_count: u32,
        color: Color,
        transform: Transform,
    },
    DebugBox {
        transform: Transform,
        half_extents: Vec3,
        color: Color,
    },
}

/// A [`Renderer`] that stores the commands of the last frame.
#[derive(Debug, Default)]
pub struct DrawRecorder {
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded since the last `begin_frame`.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn mesh_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Mesh { .. }))
            .count()
    }

    pub fn debug_box_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DebugBox { .. }))
            .count()
    }

    pub fn sun(&self) -> Option<Vec3> {
        self.commands.iter().rev().find_map(|c| match c {
            DrawCommand::Sun(dir) => Some(*dir),
            _ => None,
        })
    }

    /// Number of completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for DrawRecorder {
    fn begin_frame(&mut self) {
        self.commands.clear();
    }

    fn set_sun_direction(&mut self, direction: Vec3) {
        self.commands.push(DrawCommand::Sun(direction));
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, vertex_count: u32, color: Color, transform: &Transform) {
        self.commands.push(DrawCommand::Mesh {
            mesh,
            vertex_count,
            color,
            transform: *transform,
        });
    }

    fn draw_debug_box(&mut self, transform: &Transform, half_extents: Vec3, color: Color) {
        self.commands.push(DrawCommand::DebugBox {
            transform: *transform,
            half_extents,
            color,
        });
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}
