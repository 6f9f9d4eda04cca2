//! Program compilation and linking.

use crate::context::{GpuContext, ShaderStage};
use crate::error::{EngineError, EngineResult};

/// The fixed vertex stage.
///
/// Passes the quad corners through as clip-space positions and hands the
/// fragment stage `vPosition`, pre-scaled by the aspect ratio so the fragment
/// stage works in undistorted coordinates.
pub const VERTEX_SOURCE: &str = r#"
@group(0) @binding(0) var<uniform> uAspectRatio: f32;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) vPosition: vec2<f32>,
};

@vertex
fn vs_main(@location(0) aVertexPosition: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(aVertexPosition, 0.0, 1.0);
    out.vPosition = out.position.xy * vec2<f32>(uAspectRatio, 1.0);
    return out;
}
"#;

/// Name of the position attribute read by [`VERTEX_SOURCE`].
pub const POSITION_ATTRIBUTE: &str = "aVertexPosition";

/// A linked program together with the two stages it was linked from.
///
/// Only ever constructed from a successful link.
pub struct ShaderProgram<C: GpuContext> {
    program: C::Program,
    vertex: C::Shader,
    fragment: C::Shader,
}

impl<C: GpuContext> ShaderProgram<C> {
    /// The context's program handle.
    pub fn handle(&self) -> &C::Program {
        &self.program
    }

    /// Makes this program current.
    ///
    /// The current program is context-global state, so this runs before
    /// geometry setup and again before every draw.
    pub fn activate(&self, ctx: &mut C) {
        ctx.use_program(&self.program);
    }

    /// Deletes the program and both stages.
    pub fn release(self, ctx: &mut C) {
        ctx.delete_shader(self.vertex);
        ctx.delete_shader(self.fragment);
        ctx.delete_program(self.program);
    }
}

/// Compiles both stages, links them and activates the result.
///
/// Nothing is left allocated on failure: stages compiled so far and the
/// program object are deleted before the error is returned.
pub fn compile_and_link<C: GpuContext>(
    ctx: &mut C,
    vertex_source: &str,
    fragment_source: &str,
) -> EngineResult<ShaderProgram<C>> {
    let vertex = compile_stage(ctx, ShaderStage::Vertex, vertex_source)?;
    let fragment = match compile_stage(ctx, ShaderStage::Fragment, fragment_source) {
        Ok(shader) => shader,
        Err(err) => {
            ctx.delete_shader(vertex);
            return Err(err);
        }
    };

    let Some(mut program) = ctx.create_program() else {
        ctx.delete_shader(vertex);
        ctx.delete_shader(fragment);
        return Err(EngineError::ResourceCreation("program"));
    };

    if let Err(log) = ctx.link_program(&mut program, &vertex, &fragment) {
        ctx.delete_shader(vertex);
        ctx.delete_shader(fragment);
        ctx.delete_program(program);
        return Err(EngineError::Link { log });
    }

    log::debug!("program linked");

    let program = ShaderProgram {
        program,
        vertex,
        fragment,
    };
    program.activate(ctx);
    Ok(program)
}

fn compile_stage<C: GpuContext>(
    ctx: &mut C,
    stage: ShaderStage,
    source: &str,
) -> EngineResult<C::Shader> {
    let mut shader = ctx.create_shader(stage).ok_or(match stage {
        ShaderStage::Vertex => EngineError::ResourceCreation("vertex shader"),
        ShaderStage::Fragment => EngineError::ResourceCreation("fragment shader"),
    })?;

    if let Err(log) = ctx.compile_shader(&mut shader, source) {
        ctx.delete_shader(shader);
        return Err(EngineError::Compile { stage, log });
    }

    Ok(shader)
}
