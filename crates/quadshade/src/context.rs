//! The rendering-context seam.
//!
//! Every GPU call the engine makes goes through [`GpuContext`]. The trait is
//! shaped after the GL object model (create / compile / link / use, named
//! uniform locations, a single "current program" slot) because that is the
//! model the engine's invariants are written against. `device::WgpuContext`
//! implements it on top of wgpu.

use std::fmt;

use crate::error::EngineResult;
use crate::uniform::UniformValue;

/// Programmable stage of a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Layout of a float vertex attribute read from a bound vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Float components per vertex (1..=4).
    pub components: u32,
    /// Byte distance between consecutive vertices; 0 means tightly packed.
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u32,
    pub normalized: bool,
}

impl VertexAttribute {
    /// Tightly packed, non-normalized floats starting at offset 0.
    pub const fn packed_floats(components: u32) -> Self {
        Self {
            components,
            stride: 0,
            offset: 0,
            normalized: false,
        }
    }
}

/// GL-shaped rendering context.
///
/// Handles are owned values; `delete_*` consumes them. Creation methods return
/// `None` when the underlying API hands back a null object.
///
/// Binding state is global to the context: `use_program` and
/// `bind_vertex_attribute` affect every later call until re-bound.
pub trait GpuContext {
    type Shader;
    type Program;
    type Buffer;
    type UniformLocation;

    fn create_shader(&mut self, stage: ShaderStage) -> Option<Self::Shader>;

    /// Compiles `source` into `shader`. `Err` carries the diagnostic log.
    fn compile_shader(&mut self, shader: &mut Self::Shader, source: &str) -> Result<(), String>;

    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Option<Self::Program>;

    /// Attaches both stages to `program` and links it. `Err` carries the
    /// diagnostic log; the program is unusable afterwards.
    fn link_program(
        &mut self,
        program: &mut Self::Program,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<(), String>;

    /// Makes `program` the current program of the context.
    fn use_program(&mut self, program: &Self::Program);

    fn delete_program(&mut self, program: Self::Program);

    /// Creates a vertex buffer and uploads `contents` once (static usage).
    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Option<Self::Buffer>;

    /// Points the vertex attribute named `attribute` of `program` at `buffer`
    /// and enables it.
    ///
    /// `Err` carries a diagnostic when the program cannot draw with this
    /// attribute layout (unknown attribute, or a backend that finishes
    /// linking here and rejects the result).
    fn bind_vertex_attribute(
        &mut self,
        program: &Self::Program,
        buffer: &Self::Buffer,
        attribute: &str,
        layout: VertexAttribute,
    ) -> Result<(), String>;

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Resolves a uniform by name. Unknown names resolve to `None`.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::UniformLocation>;

    /// Writes a uniform of the current program. `None` is a silent no-op.
    fn set_uniform(&mut self, location: Option<&Self::UniformLocation>, value: UniformValue);

    /// Resizes the pixel buffer the context renders into.
    fn resize_backing_buffer(&mut self, width: u32, height: u32);

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Draws `count` vertices as a triangle strip with the current program
    /// and vertex attribute bindings.
    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> EngineResult<()>;
}
