//! Recording doubles for the context, drawable and frame host.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::context::{GpuContext, ShaderStage, VertexAttribute};
use crate::device::wgsl::{self, CompiledStage, LinkedInterface};
use crate::error::{EngineError, EngineResult};
use crate::scheduler::FrameHost;
use crate::surface::Drawable;
use crate::time::HostClock;
use crate::uniform::UniformValue;

pub(crate) const FRAGMENT: &str = r#"
@group(0) @binding(0) var<uniform> uAspectRatio: f32;
@group(0) @binding(1) var<uniform> uTime: f32;
@group(0) @binding(2) var<uniform> uColor: vec4<f32>;
@group(0) @binding(3) var<uniform> uA: f32;
@group(0) @binding(4) var<uniform> uB: f32;
@group(0) @binding(5) var<uniform> uCells: vec3<i32>;

@fragment
fn fs_main(@location(0) vPosition: vec2<f32>) -> @location(0) vec4<f32> {
    let rho = length(vPosition);
    let wave = fract(rho - uTime * 0.1 + uA + uB + f32(uCells.x));
    return uColor * wave;
}
"#;

pub(crate) const BROKEN_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0)
"#;

pub(crate) const UNLINKABLE_FRAGMENT: &str = r#"
@group(0) @binding(1) var<uniform> uTime: f32;

fn shade(p: vec2<f32>) -> vec4<f32> {
    return vec4<f32>(p, uTime, 1.0);
}
"#;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateShader(ShaderStage, u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    LinkProgram(u32),
    UseProgram(u32),
    DeleteProgram(u32),
    CreateBuffer { id: u32, bytes: usize },
    BindAttribute {
        program: u32,
        buffer: u32,
        attribute: String,
        layout: VertexAttribute,
    },
    DeleteBuffer(u32),
    SetUniform { name: String, value: UniformValue },
    ResizeBacking(u32, u32),
    Viewport(i32, i32, u32, u32),
    Draw {
        program: Option<u32>,
        first: u32,
        count: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ContextConfig {
    pub fail_program_creation: bool,
    pub fail_buffer_creation: bool,
    /// Reject attribute binding the way wgpu rejects an invalid pipeline.
    pub fail_attribute_binding: bool,
}

#[derive(Default)]
struct Recorder {
    config: ContextConfig,
    next_id: u32,
    calls: Vec<Call>,
    shaders: HashMap<u32, Option<CompiledStage>>,
    programs: HashMap<u32, Option<LinkedInterface>>,
    buffers: HashMap<u32, usize>,
    current_program: Option<u32>,
    backing_size: Option<(u32, u32)>,
    viewport: Option<(i32, i32, u32, u32)>,
    unresolved_writes: usize,
}

impl Recorder {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug)]
pub(crate) struct ShaderId(u32);

#[derive(Debug)]
pub(crate) struct ProgramId(u32);

#[derive(Debug)]
pub(crate) struct BufferId(u32);

#[derive(Debug, Clone)]
pub(crate) struct Location {
    name: String,
}

/// Context that validates WGSL for real and records every call.
///
/// Clones share one recorder, so a test can keep a handle on a context that
/// was moved into an engine.
#[derive(Clone, Default)]
pub(crate) struct RecordingContext {
    inner: Rc<RefCell<Recorder>>,
}

impl RecordingContext {
    pub fn with_config(config: ContextConfig) -> Self {
        let ctx = Self::default();
        ctx.inner.borrow_mut().config = config;
        ctx
    }

    pub fn calls(&self) -> std::cell::Ref<'_, [Call]> {
        std::cell::Ref::map(self.inner.borrow(), |r| r.calls.as_slice())
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Shaders, programs and buffers not yet deleted.
    pub fn live_objects(&self) -> usize {
        let r = self.inner.borrow();
        r.shaders.len() + r.programs.len() + r.buffers.len()
    }

    pub fn current_program(&self) -> Option<u32> {
        self.inner.borrow().current_program
    }

    pub fn program_id(&self, program: &ProgramId) -> u32 {
        program.0
    }

    pub fn draw_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. }))
            .count()
    }

    /// Values written to `name`, oldest first.
    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::SetUniform { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn unresolved_uniform_writes(&self) -> usize {
        self.inner.borrow().unresolved_writes
    }

    pub fn backing_size(&self) -> Option<(u32, u32)> {
        self.inner.borrow().backing_size
    }

    pub fn viewport(&self) -> Option<(i32, i32, u32, u32)> {
        self.inner.borrow().viewport
    }
}

impl GpuContext for RecordingContext {
    type Shader = ShaderId;
    type Program = ProgramId;
    type Buffer = BufferId;
    type UniformLocation = Location;

    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderId> {
        let mut r = self.inner.borrow_mut();
        let id = r.next_id();
        r.shaders.insert(id, None);
        r.calls.push(Call::CreateShader(stage, id));
        Some(ShaderId(id))
    }

    fn compile_shader(&mut self, shader: &mut ShaderId, source: &str) -> Result<(), String> {
        let mut r = self.inner.borrow_mut();
        r.calls.push(Call::CompileShader(shader.0));
        let stage = r
            .calls
            .iter()
            .find_map(|c| match c {
                Call::CreateShader(stage, id) if *id == shader.0 => Some(*stage),
                _ => None,
            })
            .ok_or("unknown shader")?;
        let compiled = wgsl::compile(stage, source)?;
        r.shaders.insert(shader.0, Some(compiled));
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        let mut r = self.inner.borrow_mut();
        r.shaders.remove(&shader.0);
        r.calls.push(Call::DeleteShader(shader.0));
    }

    fn create_program(&mut self) -> Option<ProgramId> {
        let mut r = self.inner.borrow_mut();
        if r.config.fail_program_creation {
            return None;
        }
        let id = r.next_id();
        r.programs.insert(id, None);
        r.calls.push(Call::CreateProgram(id));
        Some(ProgramId(id))
    }

    fn link_program(
        &mut self,
        program: &mut ProgramId,
        vertex: &ShaderId,
        fragment: &ShaderId,
    ) -> Result<(), String> {
        let mut r = self.inner.borrow_mut();
        r.calls.push(Call::LinkProgram(program.0));
        let linked = {
            let vs = r.shaders.get(&vertex.0).and_then(Option::as_ref).ok_or("vertex stage not compiled")?;
            let fs = r.shaders.get(&fragment.0).and_then(Option::as_ref).ok_or("fragment stage not compiled")?;
            wgsl::link(vs, fs)?
        };
        r.programs.insert(program.0, Some(linked));
        Ok(())
    }

    fn use_program(&mut self, program: &ProgramId) {
        let mut r = self.inner.borrow_mut();
        r.current_program = Some(program.0);
        r.calls.push(Call::UseProgram(program.0));
    }

    fn delete_program(&mut self, program: ProgramId) {
        let mut r = self.inner.borrow_mut();
        r.programs.remove(&program.0);
        if r.current_program == Some(program.0) {
            r.current_program = None;
        }
        r.calls.push(Call::DeleteProgram(program.0));
    }

    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Option<BufferId> {
        let mut r = self.inner.borrow_mut();
        if r.config.fail_buffer_creation {
            return None;
        }
        let id = r.next_id();
        r.buffers.insert(id, contents.len());
        r.calls.push(Call::CreateBuffer {
            id,
            bytes: contents.len(),
        });
        Some(BufferId(id))
    }

    fn bind_vertex_attribute(
        &mut self,
        program: &ProgramId,
        buffer: &BufferId,
        attribute: &str,
        layout: VertexAttribute,
    ) -> Result<(), String> {
        let mut r = self.inner.borrow_mut();
        r.calls.push(Call::BindAttribute {
            program: program.0,
            buffer: buffer.0,
            attribute: attribute.to_string(),
            layout,
        });
        if r.config.fail_attribute_binding {
            return Err("render pipeline rejected the vertex layout".to_string());
        }
        let linked = r
            .programs
            .get(&program.0)
            .and_then(Option::as_ref)
            .ok_or("program is not linked")?;
        if !linked.attributes.contains_key(attribute) {
            return Err(format!("vertex stage has no attribute `{attribute}`"));
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let mut r = self.inner.borrow_mut();
        r.buffers.remove(&buffer.0);
        r.calls.push(Call::DeleteBuffer(buffer.0));
    }

    fn uniform_location(&self, program: &ProgramId, name: &str) -> Option<Location> {
        let r = self.inner.borrow();
        let linked = r.programs.get(&program.0)?.as_ref()?;
        linked.uniforms.get(name).map(|_| Location {
            name: name.to_string(),
        })
    }

    fn set_uniform(&mut self, location: Option<&Location>, value: UniformValue) {
        let mut r = self.inner.borrow_mut();
        match location {
            Some(loc) => r.calls.push(Call::SetUniform {
                name: loc.name.clone(),
                value,
            }),
            None => r.unresolved_writes += 1,
        }
    }

    fn resize_backing_buffer(&mut self, width: u32, height: u32) {
        let mut r = self.inner.borrow_mut();
        r.backing_size = Some((width, height));
        r.calls.push(Call::ResizeBacking(width, height));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        let mut r = self.inner.borrow_mut();
        r.viewport = Some((x, y, width, height));
        r.calls.push(Call::Viewport(x, y, width, height));
    }

    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> EngineResult<()> {
        let mut r = self.inner.borrow_mut();
        let program = r.current_program;
        r.calls.push(Call::Draw {
            program,
            first,
            count,
        });
        Ok(())
    }
}

/// Drawable with a shared, mutable logical size.
#[derive(Clone)]
pub(crate) struct FakeDrawable {
    size: Rc<Cell<(f64, f64)>>,
    density: f64,
    unavailable: bool,
    config: ContextConfig,
    contexts: Rc<RefCell<Vec<RecordingContext>>>,
}

impl FakeDrawable {
    pub fn new(width: f64, height: f64, density: f64) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
            density,
            unavailable: false,
            config: ContextConfig::default(),
            contexts: Rc::default(),
        }
    }

    pub fn without_context(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_logical_size(&self, width: f64, height: f64) {
        self.size.set((width, height));
    }

    /// The most recently created context.
    pub fn last_context(&self) -> Option<RecordingContext> {
        self.contexts.borrow().last().cloned()
    }
}

impl Drawable for FakeDrawable {
    type Context = RecordingContext;

    fn logical_size(&self) -> (f64, f64) {
        self.size.get()
    }

    fn pixel_density(&self) -> f64 {
        self.density
    }

    fn create_context(&self) -> EngineResult<RecordingContext> {
        if self.unavailable {
            return Err(EngineError::context_unavailable("fake drawable has no context"));
        }
        let ctx = RecordingContext::with_config(self.config.clone());
        self.contexts.borrow_mut().push(ctx.clone());
        Ok(ctx)
    }
}

/// Frame host counting requests; callbacks are delivered by the test.
#[derive(Clone)]
pub(crate) struct FakeHost {
    requests: Rc<Cell<u32>>,
    observing: Rc<Cell<bool>>,
    clock: HostClock,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            requests: Rc::default(),
            observing: Rc::default(),
            clock: HostClock::start(),
        }
    }

    pub fn requests(&self) -> u32 {
        self.requests.get()
    }

    pub fn observing(&self) -> bool {
        self.observing.get()
    }
}

impl FrameHost for FakeHost {
    fn request_next_frame(&mut self) {
        self.requests.set(self.requests.get() + 1);
    }

    fn clock(&self) -> HostClock {
        self.clock
    }

    fn observe_visibility(&mut self) {
        self.observing.set(true);
    }

    fn unobserve_visibility(&mut self) {
        self.observing.set(false);
    }
}

/// Uniform names in the order they were written by each frame's draw,
/// split at draw calls.
pub(crate) fn writes_per_frame(ctx: &RecordingContext) -> Vec<Vec<String>> {
    let mut frames = vec![Vec::new()];
    for call in ctx.calls().iter() {
        match call {
            Call::SetUniform { name, .. } => frames.last_mut().unwrap().push(name.clone()),
            Call::Draw { .. } => frames.push(Vec::new()),
            _ => {}
        }
    }
    frames.pop();
    frames
}
