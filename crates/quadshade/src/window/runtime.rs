use std::collections::HashMap;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::GpuInit;
use crate::engine::animate;
use crate::error::{EngineError, EngineResult};
use crate::time::HostClock;

use super::{App, AppControl, WindowDrawable, WindowHost, WindowShader};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "quadshade".to_string(),
            initial_size: LogicalSize::new(960.0, 540.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens a window, animates `app`'s fragment stage in it and runs the
    /// event loop until the window closes.
    ///
    /// Setup failures and surface loss end the loop and are returned. Other
    /// frame failures halt the window's loop and go to [`App::on_frame_error`].
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    occluded: bool,
    minimized: bool,

    window: Window,

    /// `None` once disposed.
    #[borrows(window)]
    #[not_covariant]
    shader: Option<WindowShader<'this>>,
}

impl WindowEntry {
    fn visible(&self) -> bool {
        self.with(|fields| !*fields.occluded && !*fields.minimized)
    }

    /// Forwards the current visibility if the engine observes it.
    fn sync_visibility(&mut self) -> EngineResult<()> {
        let visible = self.visible();
        self.drive(|shader| {
            if shader.host().is_observing() {
                shader.set_visible(visible)
            } else {
                Ok(())
            }
        })
    }

    /// Runs `f` against the shader unless it was disposed.
    fn drive(
        &mut self,
        f: impl FnOnce(&mut WindowShader<'_>) -> EngineResult<()>,
    ) -> EngineResult<()> {
        self.with_shader_mut(|shader| match shader {
            Some(shader) => f(shader),
            None => Ok(()),
        })
    }

    fn dispose(&mut self) {
        self.with_shader_mut(|shader| {
            if let Some(shader) = shader.take() {
                shader.dispose();
            }
        });
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    clock: HostClock,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            initial,
            gpu_init,
            clock: HostClock::start(),
            app,
            windows: HashMap::new(),
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        event_loop.exit();
    }

    /// Builds the window, attaches the program and runs `on_attach`. Does
    /// not render; the first frame goes through [`Self::sync`].
    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowId> {
        let config = self.initial.clone();
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let gpu_init = self.gpu_init.clone();
        let clock = self.clock;
        let source = self.app.fragment_source().into_owned();

        let mut entry = WindowEntryTryBuilder {
            occluded: false,
            minimized: false,
            window,
            shader_builder: |w| {
                let drawable = WindowDrawable::new(w, gpu_init);
                let host = WindowHost::new(w, clock);
                animate(drawable, &source, host).map(Some)
            },
        }
        .try_build()
        .context("failed to attach the fragment program")?;

        let app = &mut self.app;
        entry
            .with_shader_mut(|shader| match shader {
                Some(shader) => app.on_attach(shader),
                None => Ok(()),
            })
            .context("application setup failed")?;

        entry.with_mut(|fields| {
            *fields.minimized = is_minimized(fields.window, fields.window.inner_size());
        });

        log::info!("window {id:?} attached");
        self.windows.insert(id, entry);
        Ok(id)
    }

    fn destroy_window_entry(&mut self, id: WindowId) {
        if let Some(mut entry) = self.windows.remove(&id) {
            entry.dispose();
        }
    }

    /// Forwards the window's visibility and handles a failed frame.
    fn sync(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        let result = match self.windows.get_mut(&id) {
            Some(entry) => entry.sync_visibility(),
            None => Ok(()),
        };
        self.handle_frame_result(event_loop, id, result);
    }

    /// Single exit for every frame the runtime drives, the first included.
    fn handle_frame_result(
        &mut self,
        event_loop: &ActiveEventLoop,
        id: WindowId,
        result: EngineResult<()>,
    ) {
        let Err(err) = result else { return };

        let app = &mut self.app;
        let entry = self.windows.get_mut(&id);
        let failure = classify_failure(&err, || match entry {
            Some(entry) => entry.with_shader_mut(|shader| match shader {
                Some(shader) => app.on_frame_error(shader, &err),
                None => AppControl::Continue,
            }),
            None => AppControl::Continue,
        });

        match failure {
            FrameFailure::Fatal => {
                self.destroy_window_entry(id);
                self.fail(event_loop, anyhow::Error::new(err).context("surface lost"));
            }
            FrameFailure::Exit => {
                self.destroy_window_entry(id);
                event_loop.exit();
            }
            FrameFailure::Halted => {}
        }
    }
}

/// What the runtime does with a failed frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum FrameFailure {
    /// Tear the window down and end the loop with the error.
    Fatal,
    /// Tear the window down and exit cleanly.
    Exit,
    /// Keep the window; its loop stays halted until resumed.
    Halted,
}

/// `decide` is consulted only for errors the window survives.
fn classify_failure(err: &EngineError, decide: impl FnOnce() -> AppControl) -> FrameFailure {
    if err.is_fatal() {
        return FrameFailure::Fatal;
    }
    match decide() {
        AppControl::Exit => FrameFailure::Exit,
        AppControl::Continue | AppControl::Resume => FrameFailure::Halted,
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        match self.create_window_entry(event_loop) {
            Ok(id) => self.sync(event_loop, id),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match self.app.on_window_event(&event) {
            AppControl::Exit => {
                self.destroy_window_entry(window_id);
                event_loop.exit();
                return;
            }
            AppControl::Resume => {
                let result = match self.windows.get_mut(&window_id) {
                    Some(entry) => entry.drive(|shader| shader.resume()),
                    None => Ok(()),
                };
                self.handle_frame_result(event_loop, window_id, result);
            }
            AppControl::Continue => {}
        }

        let Some(entry) = self.windows.get_mut(&window_id) else {
            return;
        };

        let result = match &event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry(window_id);
                if self.windows.is_empty() {
                    event_loop.exit();
                }
                return;
            }

            WindowEvent::Occluded(occluded) => {
                entry.with_occluded_mut(|o| *o = *occluded);
                entry.sync_visibility()
            }

            WindowEvent::Resized(size) => {
                let minimized = entry.with_window(|w| is_minimized(w, *size));
                entry.with_minimized_mut(|m| *m = minimized);
                entry.sync_visibility()
            }

            WindowEvent::RedrawRequested => entry.drive(|shader| shader.on_frame()),

            _ => Ok(()),
        };

        self.handle_frame_result(event_loop, window_id, result);
    }
}

fn is_minimized(window: &Window, size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0 || window.is_minimized().unwrap_or(false)
}
