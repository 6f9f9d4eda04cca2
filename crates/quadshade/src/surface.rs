//! Drawable surfaces and resize tracking.

use crate::context::GpuContext;
use crate::error::EngineResult;
use crate::program::ShaderProgram;
use crate::uniform::{set_named, UniformValue};

/// Name of the intrinsic aspect-ratio uniform.
pub const ASPECT_RATIO_UNIFORM: &str = "uAspectRatio";

/// A visual target the engine renders into.
pub trait Drawable {
    type Context: GpuContext;

    /// Displayed size in logical (layout) pixels.
    fn logical_size(&self) -> (f64, f64);

    /// Physical pixels per logical pixel.
    fn pixel_density(&self) -> f64;

    /// Creates the rendering context bound to this drawable.
    fn create_context(&self) -> EngineResult<Self::Context>;
}

/// Per-instance surface bookkeeping.
///
/// Dimensions start at `(0, 0)` so the first refresh always resizes and
/// publishes the aspect ratio.
pub struct SurfaceState<D: Drawable> {
    drawable: D,
    width: f64,
    height: f64,
    program: ShaderProgram<D::Context>,
}

impl<D: Drawable> SurfaceState<D> {
    pub fn new(drawable: D, program: ShaderProgram<D::Context>) -> Self {
        Self {
            drawable,
            width: 0.0,
            height: 0.0,
            program,
        }
    }

    pub fn drawable(&self) -> &D {
        &self.drawable
    }

    pub fn program(&self) -> &ShaderProgram<D::Context> {
        &self.program
    }

    /// Last recorded logical size.
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub(crate) fn into_parts(self) -> (D, ShaderProgram<D::Context>) {
        (self.drawable, self.program)
    }
}

/// Brings the backing buffer, viewport and `uAspectRatio` in line with the
/// drawable's current logical size.
///
/// Returns `true` if the size changed. Does nothing, GPU-wise, otherwise.
/// The size is not clamped: layout must bound the drawable, or growing the
/// backing buffer can feed back into its displayed size.
pub fn refresh_if_resized<D: Drawable>(ctx: &mut D::Context, state: &mut SurfaceState<D>) -> bool {
    let (width, height) = state.drawable.logical_size();
    if width == state.width && height == state.height {
        return false;
    }

    state.width = width;
    state.height = height;

    let density = state.drawable.pixel_density();
    let px_width = to_device_pixels(width, density);
    let px_height = to_device_pixels(height, density);

    log::debug!(
        "surface resized to {width}x{height} logical ({px_width}x{px_height} px at density {density})"
    );

    ctx.resize_backing_buffer(px_width, px_height);
    ctx.set_viewport(0, 0, px_width, px_height);

    if height > 0.0 {
        let aspect_ratio = (width / height) as f32;
        set_named(
            ctx,
            &state.program,
            ASPECT_RATIO_UNIFORM,
            UniformValue::F1(aspect_ratio),
        );
    } else {
        log::debug!("zero-height surface; aspect ratio left unchanged");
    }

    true
}

fn to_device_pixels(logical: f64, density: f64) -> u32 {
    // `as` saturates: negative/NaN become 0, overflow becomes u32::MAX.
    (logical * density).round() as u32
}
