//! wgpu backend.
//!
//! - `Gpu`: instance/adapter/device/queue plus the window surface (swapchain)
//! - `WgpuContext`: the engine's `GpuContext` over `Gpu`
//! - `wgsl`: per-stage WGSL compilation and cross-stage interface reflection

mod context;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;
pub mod wgsl;

pub use context::{WgpuBuffer, WgpuContext, WgpuProgram, WgpuShader, WgpuUniformLocation};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
