//! The full-surface quad.

use bytemuck::{Pod, Zeroable};

use crate::context::{GpuContext, VertexAttribute};
use crate::error::{EngineError, EngineResult};
use crate::program::{ShaderProgram, POSITION_ATTRIBUTE};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2], // clip space
}

const TOP: f32 = 1.0;
const BOTTOM: f32 = -1.0;
const LEFT: f32 = -1.0;
const RIGHT: f32 = 1.0;

/// Corners in mirrored-Z order: as a triangle strip, vertices 0-1-2 and
/// 1-2-3 form the two halves of the surface.
pub const FULL_SURFACE_QUAD: [QuadVertex; 4] = [
    QuadVertex { pos: [RIGHT, TOP] },
    QuadVertex { pos: [LEFT, TOP] },
    QuadVertex { pos: [RIGHT, BOTTOM] },
    QuadVertex { pos: [LEFT, BOTTOM] },
];

/// The uploaded quad. Never resized after upload.
pub struct QuadGeometry<C: GpuContext> {
    buffer: C::Buffer,
}

impl<C: GpuContext> QuadGeometry<C> {
    /// Issues the single draw call of a frame.
    ///
    /// No clear precedes it: the quad covers every pixel.
    pub fn draw(&self, ctx: &mut C) -> EngineResult<()> {
        ctx.draw_triangle_strip(0, FULL_SURFACE_QUAD.len() as u32)
    }

    pub fn release(self, ctx: &mut C) {
        ctx.delete_buffer(self.buffer);
    }
}

/// Uploads the quad and binds it to the position attribute of `program`.
///
/// `program` must be the current program. A rejected attribute binding is
/// reported as [`EngineError::Link`] and leaves no buffer behind.
pub fn provision_full_surface_quad<C: GpuContext>(
    ctx: &mut C,
    program: &ShaderProgram<C>,
) -> EngineResult<QuadGeometry<C>> {
    let buffer = ctx
        .create_vertex_buffer(bytemuck::cast_slice(&FULL_SURFACE_QUAD))
        .ok_or(EngineError::ResourceCreation("vertex buffer"))?;

    if let Err(log) = ctx.bind_vertex_attribute(
        program.handle(),
        &buffer,
        POSITION_ATTRIBUTE,
        VertexAttribute::packed_floats(2),
    ) {
        ctx.delete_buffer(buffer);
        return Err(EngineError::Link { log });
    }

    log::debug!("full-surface quad uploaded");
    Ok(QuadGeometry { buffer })
}
