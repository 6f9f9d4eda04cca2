//! quadshade: renders a fragment program onto a full-surface quad and
//! animates it while the surface is visible.
//!
//! The engine core (`program`, `geometry`, `uniform`, `surface`, `scheduler`,
//! `engine`) is written against the [`GpuContext`] seam. `device` implements
//! that seam over wgpu, and `window` hosts it in a winit window.

pub mod context;
pub mod device;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod paint;
pub mod program;
pub mod scheduler;
pub mod surface;
pub mod time;
pub mod uniform;
pub mod window;

#[cfg(test)]
mod test_support;

pub use context::{GpuContext, ShaderStage};
pub use engine::{animate, attach, Attached, QuadShader, TIME_UNIFORM};
pub use error::{EngineError, EngineResult};
pub use paint::Color;
pub use scheduler::FrameHost;
pub use surface::{Drawable, ASPECT_RATIO_UNIFORM};
pub use uniform::{UniformData, UniformSource, UniformValue};
