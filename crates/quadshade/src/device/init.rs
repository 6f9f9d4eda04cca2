/// How [`Gpu::new`](super::Gpu::new) sets up the adapter and the window
/// surface.
///
/// The quad pipeline needs no optional features, so none can be requested.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface format when the surface offers one.
    pub prefer_srgb: bool,

    /// FIFO paces the frame loop to the display, one redraw per vblank.
    pub present_mode: wgpu::PresentMode,

    /// Requested compositing mode. Falls back to a supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// A full-surface shader usually runs behind other content; the default
    /// prefers the integrated adapter.
    pub power_preference: wgpu::PowerPreference,

    /// Downlevel defaults cover one bind group of small uniform buffers.
    pub required_limits: wgpu::Limits,

    /// Hint only.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::LowPower,
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}
