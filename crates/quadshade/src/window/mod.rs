//! winit host.
//!
//! Owns the event loop and one window per engine instance, translates window
//! state into visibility signals and redraws into frame callbacks.

mod app;
mod host;
mod runtime;

pub use app::{App, AppControl};
pub use host::{WindowDrawable, WindowHost, WindowShader};
pub use runtime::{Runtime, RuntimeConfig};
