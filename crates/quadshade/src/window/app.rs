use std::borrow::Cow;

use winit::event::WindowEvent;

use crate::error::EngineError;

use super::WindowShader;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    /// Restart a frame loop halted by a failed frame. No-op otherwise.
    Resume,
    Exit,
}

/// Application contract for [`Runtime`](super::Runtime).
pub trait App {
    /// Fragment stage to animate in the window.
    fn fragment_source(&self) -> Cow<'_, str>;

    /// Called once after the program is linked and `uTime` is registered,
    /// before the first frame. Register uniforms here.
    fn on_attach(&mut self, shader: &mut WindowShader<'_>) -> anyhow::Result<()> {
        let _ = shader;
        Ok(())
    }

    /// Called for every window event, before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called when a frame fails without losing the surface, including the
    /// first frame. The loop is halted; return [`AppControl::Resume`] from a
    /// later `on_window_event` to restart it. `Resume` returned here counts
    /// as `Continue`.
    fn on_frame_error(&mut self, shader: &mut WindowShader<'_>, err: &EngineError) -> AppControl {
        let _ = shader;
        match std::error::Error::source(err) {
            Some(cause) => log::error!("frame failed, loop halted: {err}: {cause}"),
            None => log::error!("frame failed, loop halted: {err}"),
        }
        AppControl::Continue
    }
}
