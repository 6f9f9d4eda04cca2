use winit::dpi::LogicalSize;
use winit::window::Window;

use crate::device::{Gpu, GpuInit, WgpuContext};
use crate::engine::QuadShader;
use crate::error::{EngineError, EngineResult};
use crate::scheduler::FrameHost;
use crate::surface::Drawable;
use crate::time::HostClock;

/// Engine handle animating a window.
pub type WindowShader<'w> = QuadShader<WindowDrawable<'w>, WindowHost<'w>>;

/// A window's client area as a drawable.
pub struct WindowDrawable<'w> {
    window: &'w Window,
    init: GpuInit,
}

impl<'w> WindowDrawable<'w> {
    pub fn new(window: &'w Window, init: GpuInit) -> Self {
        Self { window, init }
    }

    pub fn window(&self) -> &'w Window {
        self.window
    }
}

impl<'w> Drawable for WindowDrawable<'w> {
    type Context = WgpuContext<'w>;

    fn logical_size(&self) -> (f64, f64) {
        let logical: LogicalSize<f64> = self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width, logical.height)
    }

    fn pixel_density(&self) -> f64 {
        self.window.scale_factor()
    }

    fn create_context(&self) -> EngineResult<WgpuContext<'w>> {
        let gpu = pollster::block_on(Gpu::new(self.window, self.init.clone()))
            .map_err(|e| EngineError::context_unavailable(format!("{e:#}")))?;
        Ok(WgpuContext::new(gpu))
    }
}

/// Frame host backed by winit redraw requests.
pub struct WindowHost<'w> {
    window: &'w Window,
    clock: HostClock,
    observing: bool,
}

impl<'w> WindowHost<'w> {
    pub fn new(window: &'w Window, clock: HostClock) -> Self {
        Self {
            window,
            clock,
            observing: false,
        }
    }

    /// Whether visibility changes should be forwarded to the engine.
    pub fn is_observing(&self) -> bool {
        self.observing
    }
}

impl FrameHost for WindowHost<'_> {
    fn request_next_frame(&mut self) {
        self.window.request_redraw();
    }

    fn clock(&self) -> HostClock {
        self.clock
    }

    fn observe_visibility(&mut self) {
        self.observing = true;
    }

    fn unobserve_visibility(&mut self) {
        self.observing = false;
    }
}
