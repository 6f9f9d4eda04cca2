//! Radial waves: rings expanding from the cursor, tinted with a CSS color.

use std::borrow::Cow;
use std::cell::Cell;
use std::rc::Rc;

use anyhow::Context;
use quadshade::device::GpuInit;
use quadshade::logging::{init_logging, LoggingConfig};
use quadshade::window::{App, AppControl, Runtime, RuntimeConfig, WindowShader};
use quadshade::{Color, UniformSource};
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, WindowEvent};

const RADIAL_WAVES: &str = r#"
@group(0) @binding(1) var<uniform> uTime: f32;
@group(0) @binding(2) var<uniform> uColor: vec4<f32>;
@group(0) @binding(3) var<uniform> uCenter: vec2<f32>;

@fragment
fn fs_main(@location(0) vPosition: vec2<f32>) -> @location(0) vec4<f32> {
    let rho = length(vPosition - uCenter);
    let phase = rho - uTime / 10.0;
    let v = phase - floor(phase / 0.2) * 0.2;
    var alpha = smoothstep(0.1, 0.2, v);
    alpha *= 1.0 - smoothstep(0.0, 1.0, rho);
    let fade_in = smoothstep(0.0, 1.0, uTime);
    return fade_in * alpha * uColor;
}
"#;

const ACCENT: &str = "rgba(64, 156, 255, 1)";

struct RadialWaves {
    accent: Color,
    size: PhysicalSize<u32>,
    /// Wave origin in aspect-corrected surface coordinates.
    center: Rc<Cell<[f32; 2]>>,
}

impl RadialWaves {
    fn new(accent: Color) -> Self {
        Self {
            accent,
            size: PhysicalSize::new(0, 0),
            center: Rc::new(Cell::new([0.0, 0.0])),
        }
    }

    fn track_cursor(&self, pos: PhysicalPosition<f64>) {
        let (w, h) = (f64::from(self.size.width), f64::from(self.size.height));
        if w == 0.0 || h == 0.0 {
            return;
        }
        let x = (2.0 * pos.x / w - 1.0) * (w / h);
        let y = 1.0 - 2.0 * pos.y / h;
        self.center.set([x as f32, y as f32]);
    }
}

impl App for RadialWaves {
    fn fragment_source(&self) -> Cow<'_, str> {
        Cow::Borrowed(RADIAL_WAVES)
    }

    fn on_attach(&mut self, shader: &mut WindowShader<'_>) -> anyhow::Result<()> {
        shader.uniform::<Color>("uColor", self.accent);

        let center = Rc::clone(&self.center);
        shader.uniform2f("uCenter", UniformSource::producer(move || center.get()));

        log::info!("{} dynamic uniform(s) registered", shader.uniforms().len());
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::Resized(size) => self.size = *size,
            WindowEvent::CursorMoved { position, .. } => self.track_cursor(*position),
            WindowEvent::CursorLeft { .. } => self.center.set([0.0, 0.0]),
            // Click restarts the loop if a frame failed.
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            } => return AppControl::Resume,
            _ => {}
        }
        AppControl::Continue
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let accent = Color::parse_css(ACCENT).context("invalid accent color")?;

    Runtime::run(
        RuntimeConfig {
            title: "quadshade · radial waves".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        },
        GpuInit::default(),
        RadialWaves::new(accent),
    )
}
