//! Attaching a fragment program to a drawable, and the animated handle.

use crate::error::EngineResult;
use crate::geometry::{provision_full_surface_quad, QuadGeometry};
use crate::program::{compile_and_link, VERTEX_SOURCE};
use crate::scheduler::{FrameHost, FrameTrigger, RenderScheduler, SchedulerState, Transition};
use crate::surface::{refresh_if_resized, Drawable, SurfaceState};
use crate::uniform::{UniformData, UniformRegistry, UniformSource};

/// Name of the intrinsic elapsed-time uniform.
pub const TIME_UNIFORM: &str = "uTime";

/// A drawable with a compiled program and uploaded quad, not yet animated.
pub struct Attached<D: Drawable> {
    pub context: D::Context,
    pub state: SurfaceState<D>,
    pub geometry: QuadGeometry<D::Context>,
}

/// Creates a context for `drawable`, compiles `fragment_source` against the
/// fixed vertex stage and uploads the full-surface quad.
///
/// On error nothing stays allocated and nothing is scheduled.
pub fn attach<D: Drawable>(drawable: D, fragment_source: &str) -> EngineResult<Attached<D>> {
    let mut context = drawable.create_context()?;
    let program = compile_and_link(&mut context, VERTEX_SOURCE, fragment_source)?;

    let geometry = match provision_full_surface_quad(&mut context, &program) {
        Ok(geometry) => geometry,
        Err(err) => {
            program.release(&mut context);
            return Err(err);
        }
    };

    Ok(Attached {
        context,
        state: SurfaceState::new(drawable, program),
        geometry,
    })
}

/// Attaches, registers `uTime` and starts observing visibility.
///
/// The returned handle stays `Stopped` until the host reports the drawable
/// visible.
pub fn animate<D, H>(drawable: D, fragment_source: &str, host: H) -> EngineResult<QuadShader<D, H>>
where
    D: Drawable,
    H: FrameHost,
{
    let attached = attach(drawable, fragment_source)?;
    let mut shader = QuadShader::new(attached, host);

    let clock = shader.host.clock();
    shader.uniform1f(TIME_UNIFORM, UniformSource::producer(move || clock.elapsed_secs()));

    shader.host.observe_visibility();
    Ok(shader)
}

/// Engine handle: one drawable, one program, one frame loop.
pub struct QuadShader<D: Drawable, H: FrameHost> {
    context: D::Context,
    state: SurfaceState<D>,
    geometry: QuadGeometry<D::Context>,
    uniforms: UniformRegistry,
    scheduler: RenderScheduler,
    host: H,
}

impl<D: Drawable, H: FrameHost> QuadShader<D, H> {
    /// Wraps an attached drawable. No uniforms are registered and visibility
    /// is not observed; see [`animate`].
    pub fn new(attached: Attached<D>, host: H) -> Self {
        let Attached {
            context,
            state,
            geometry,
        } = attached;

        Self {
            context,
            state,
            geometry,
            uniforms: UniformRegistry::new(),
            scheduler: RenderScheduler::new(),
            host,
        }
    }

    /// Registers a uniform of any supported arity/kind.
    ///
    /// Constants are written now; producers run before every frame, after
    /// those registered earlier.
    pub fn uniform<T: UniformData>(&mut self, name: &str, source: impl Into<UniformSource<T>>) {
        let program = self.state.program();
        program.activate(&mut self.context);
        self.uniforms
            .register(&mut self.context, program, name, source.into());
    }

    pub fn uniform1f(&mut self, name: &str, source: impl Into<UniformSource<f32>>) {
        self.uniform::<f32>(name, source);
    }

    pub fn uniform2f(&mut self, name: &str, source: impl Into<UniformSource<[f32; 2]>>) {
        self.uniform::<[f32; 2]>(name, source);
    }

    pub fn uniform3f(&mut self, name: &str, source: impl Into<UniformSource<[f32; 3]>>) {
        self.uniform::<[f32; 3]>(name, source);
    }

    pub fn uniform4f(&mut self, name: &str, source: impl Into<UniformSource<[f32; 4]>>) {
        self.uniform::<[f32; 4]>(name, source);
    }

    pub fn uniform1i(&mut self, name: &str, source: impl Into<UniformSource<i32>>) {
        self.uniform::<i32>(name, source);
    }

    pub fn uniform2i(&mut self, name: &str, source: impl Into<UniformSource<[i32; 2]>>) {
        self.uniform::<[i32; 2]>(name, source);
    }

    pub fn uniform3i(&mut self, name: &str, source: impl Into<UniformSource<[i32; 3]>>) {
        self.uniform::<[i32; 3]>(name, source);
    }

    pub fn uniform4i(&mut self, name: &str, source: impl Into<UniformSource<[i32; 4]>>) {
        self.uniform::<[i32; 4]>(name, source);
    }

    /// Visibility signal from the host.
    ///
    /// Becoming visible renders one frame before returning.
    pub fn set_visible(&mut self, visible: bool) -> EngineResult<()> {
        match self.scheduler.visibility_changed(visible) {
            Transition::Started => self.kickstart(),
            Transition::Stopped | Transition::Unchanged => Ok(()),
        }
    }

    /// A requested host frame fired.
    ///
    /// A no-op (that does not requeue) once the loop is stopped.
    pub fn on_frame(&mut self) -> EngineResult<()> {
        self.run(FrameTrigger::Callback)
    }

    /// Restarts a loop halted by a failed frame.
    pub fn resume(&mut self) -> EngineResult<()> {
        match self.scheduler.resume() {
            Transition::Started => self.kickstart(),
            Transition::Stopped | Transition::Unchanged => Ok(()),
        }
    }

    fn kickstart(&mut self) -> EngineResult<()> {
        self.run(FrameTrigger::Kickstart)
    }

    fn run(&mut self, trigger: FrameTrigger) -> EngineResult<()> {
        if !self.scheduler.begin_frame(trigger, &mut self.host) {
            return Ok(());
        }
        log::trace!("frame ({trigger:?})");

        self.render_frame().inspect_err(|err| {
            log::debug!("frame failed: {err}");
            self.scheduler.halt();
        })
    }

    /// One frame body: re-bind, refresh the surface, evaluate dynamic
    /// uniforms, draw.
    fn render_frame(&mut self) -> EngineResult<()> {
        self.state.program().activate(&mut self.context);
        refresh_if_resized(&mut self.context, &mut self.state);
        self.uniforms.evaluate(&mut self.context, self.state.program())?;
        self.geometry.draw(&mut self.context)
    }

    pub fn state(&self) -> &SurfaceState<D> {
        &self.state
    }

    pub fn drawable(&self) -> &D {
        self.state.drawable()
    }

    pub fn context(&self) -> &D::Context {
        &self.context
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn uniforms(&self) -> &UniformRegistry {
        &self.uniforms
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Whether the frame loop is running (the drawable is visible and the
    /// loop is not halted).
    pub fn should_render(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn is_halted(&self) -> bool {
        self.scheduler.is_halted()
    }

    /// Stops observing visibility and releases the program, both stages and
    /// the quad buffer.
    ///
    /// The context is dropped last.
    pub fn dispose(self) {
        let Self {
            mut context,
            state,
            geometry,
            mut host,
            ..
        } = self;

        host.unobserve_visibility();
        geometry.release(&mut context);
        let (_drawable, program) = state.into_parts();
        program.release(&mut context);
        log::debug!("quad shader disposed");
    }
}
