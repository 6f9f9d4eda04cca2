use std::collections::{BTreeMap, HashMap};

use wgpu::util::DeviceExt;

use crate::context::{GpuContext, ShaderStage, VertexAttribute};
use crate::error::EngineResult;
use crate::uniform::{UniformType, UniformValue};

use super::wgsl::{self, CompiledStage, LinkedInterface, UNIFORM_GROUP};
use super::Gpu;

/// Size of every uniform buffer: one `vec4` worth, enough for any supported
/// scalar or vector.
const UNIFORM_BUFFER_SIZE: u64 = 16;

/// A stage as the engine sees it: source plus, once compiled, the validated
/// module.
pub struct WgpuShader {
    stage: ShaderStage,
    source: String,
    compiled: Option<CompiledStage>,
}

/// Handle to a program slot owned by the context.
#[derive(Debug)]
pub struct WgpuProgram(u32);

pub struct WgpuBuffer(wgpu::Buffer);

#[derive(Debug, Clone)]
pub struct WgpuUniformLocation {
    program: u32,
    binding: u32,
    ty: UniformType,
}

struct UniformBuffer {
    ty: UniformType,
    buffer: wgpu::Buffer,
}

/// Everything a successful link produced.
struct LinkedProgram {
    interface: LinkedInterface,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    bind_group: wgpu::BindGroup,
    uniforms: BTreeMap<u32, UniformBuffer>,
    /// Built once a vertex attribute is bound; the vertex layout is part of it.
    pipeline: Option<wgpu::RenderPipeline>,
    vertex_buffer: Option<wgpu::Buffer>,
}

/// [`GpuContext`] over wgpu.
///
/// Shaders are WGSL. Each uniform in `@group(0)` is backed by its own small
/// buffer, so a uniform write is a `queue.write_buffer` into the current
/// program's slot. The render pipeline is created when the position
/// attribute is bound, and every draw records and submits one render pass
/// into the next swapchain texture.
pub struct WgpuContext<'w> {
    gpu: Gpu<'w>,
    programs: HashMap<u32, Option<LinkedProgram>>,
    next_program: u32,
    current: Option<u32>,
    viewport: Option<(i32, i32, u32, u32)>,
}

impl<'w> WgpuContext<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        Self {
            gpu,
            programs: HashMap::new(),
            next_program: 0,
            current: None,
            viewport: None,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    fn linked(&self, id: u32) -> Option<&LinkedProgram> {
        self.programs.get(&id)?.as_ref()
    }

    fn link(&self, vertex: &WgpuShader, fragment: &WgpuShader) -> Result<LinkedProgram, String> {
        let (Some(vs), Some(fs)) = (&vertex.compiled, &fragment.compiled) else {
            return Err("both stages must be compiled before linking".to_string());
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("stages attached in the wrong slots".to_string());
        }

        let interface = wgsl::link(vs, fs)?;
        let device = self.gpu.device();

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = shader_module(device, "quadshade vertex stage", &vertex.source);
        let fragment_module = shader_module(device, "quadshade fragment stage", &fragment.source);

        let layout_entries: Vec<_> = interface
            .uniforms
            .values()
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadshade uniforms bgl"),
            entries: &layout_entries,
        });

        let uniforms: BTreeMap<u32, UniformBuffer> = interface
            .uniforms
            .iter()
            .map(|(name, slot)| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(name.as_str()),
                    contents: &[0u8; UNIFORM_BUFFER_SIZE as usize],
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                (slot.binding, UniformBuffer { ty: slot.ty, buffer })
            })
            .collect();

        let bind_entries: Vec<_> = uniforms
            .iter()
            .map(|(binding, u)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: u.buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadshade uniforms"),
            layout: &bind_group_layout,
            entries: &bind_entries,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadshade pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(err.to_string());
        }

        Ok(LinkedProgram {
            interface,
            vertex_module,
            fragment_module,
            layout,
            bind_group,
            uniforms,
            pipeline: None,
            vertex_buffer: None,
        })
    }

    /// Acquires a frame and records the single quad pass.
    fn draw_pass(&mut self, program: u32, first: u32, count: u32) -> EngineResult<()> {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let reason = err.to_string();
                return self.gpu.handle_surface_error(err).into_frame_result(reason);
            }
        };

        let size = self.gpu.size();
        let Some(linked) = self.linked(program) else {
            return Ok(());
        };
        let (Some(pipeline), Some(vertex_buffer)) = (&linked.pipeline, &linked.vertex_buffer)
        else {
            log::warn!("draw skipped: no vertex attribute bound to the current program");
            return Ok(());
        };

        {
            let mut rpass = frame.quad_pass();

            if let Some((x, y, w, h)) = self.viewport.and_then(|vp| clamp_viewport(vp, (size.width, size.height))) {
                rpass.set_viewport(x, y, w, h, 0.0, 1.0);
            }
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(UNIFORM_GROUP, &linked.bind_group, &[]);
            rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
            rpass.draw(first..first + count, 0..1);
        }

        self.gpu.submit(frame);
        Ok(())
    }
}

impl GpuContext for WgpuContext<'_> {
    type Shader = WgpuShader;
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;
    type UniformLocation = WgpuUniformLocation;

    fn create_shader(&mut self, stage: ShaderStage) -> Option<WgpuShader> {
        Some(WgpuShader {
            stage,
            source: String::new(),
            compiled: None,
        })
    }

    fn compile_shader(&mut self, shader: &mut WgpuShader, source: &str) -> Result<(), String> {
        shader.source = source.to_owned();
        shader.compiled = Some(wgsl::compile(shader.stage, source)?);
        Ok(())
    }

    fn delete_shader(&mut self, shader: WgpuShader) {
        drop(shader);
    }

    fn create_program(&mut self) -> Option<WgpuProgram> {
        let id = self.next_program;
        self.next_program = self.next_program.checked_add(1)?;
        self.programs.insert(id, None);
        Some(WgpuProgram(id))
    }

    fn link_program(
        &mut self,
        program: &mut WgpuProgram,
        vertex: &WgpuShader,
        fragment: &WgpuShader,
    ) -> Result<(), String> {
        let linked = self.link(vertex, fragment)?;
        log::debug!(
            "program {} linked with {} uniform(s)",
            program.0,
            linked.uniforms.len()
        );
        self.programs.insert(program.0, Some(linked));
        Ok(())
    }

    fn use_program(&mut self, program: &WgpuProgram) {
        self.current = Some(program.0);
    }

    fn delete_program(&mut self, program: WgpuProgram) {
        self.programs.remove(&program.0);
        if self.current == Some(program.0) {
            self.current = None;
        }
    }

    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Option<WgpuBuffer> {
        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quadshade vertex buffer"),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        Some(WgpuBuffer(buffer))
    }

    fn bind_vertex_attribute(
        &mut self,
        program: &WgpuProgram,
        buffer: &WgpuBuffer,
        attribute: &str,
        layout: VertexAttribute,
    ) -> Result<(), String> {
        let format = self.gpu.surface_format();
        let device = self.gpu.device();

        let Some(Some(linked)) = self.programs.get_mut(&program.0) else {
            return Err(format!("attribute `{attribute}` bound to a program that is not linked"));
        };
        let Some(&location) = linked.interface.attributes.get(attribute) else {
            return Err(format!("vertex stage has no attribute `{attribute}`"));
        };
        let vertex_format = float_format(layout.components)
            .ok_or_else(|| format!("unsupported attribute width: {} components", layout.components))?;

        let attributes = [wgpu::VertexAttribute {
            format: vertex_format,
            offset: u64::from(layout.offset),
            shader_location: location,
        }];
        let stride = match layout.stride {
            0 => vertex_format.size(),
            stride => u64::from(stride),
        };

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quadshade pipeline"),
            layout: Some(&linked.layout),
            vertex: wgpu::VertexState {
                module: &linked.vertex_module,
                entry_point: Some(linked.interface.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &linked.fragment_module,
                entry_point: Some(linked.interface.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(format!("render pipeline rejected: {err}"));
        }

        linked.pipeline = Some(pipeline);
        linked.vertex_buffer = Some(buffer.0.clone());
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: WgpuBuffer) {
        drop(buffer);
    }

    fn uniform_location(&self, program: &WgpuProgram, name: &str) -> Option<WgpuUniformLocation> {
        let slot = self.linked(program.0)?.interface.uniforms.get(name)?;
        Some(WgpuUniformLocation {
            program: program.0,
            binding: slot.binding,
            ty: slot.ty,
        })
    }

    fn set_uniform(&mut self, location: Option<&WgpuUniformLocation>, value: UniformValue) {
        let Some(location) = location else { return };

        if self.current != Some(location.program) {
            log::warn!("uniform write ignored: location belongs to a program that is not current");
            return;
        }
        let Some(uniform) = self
            .linked(location.program)
            .and_then(|p| p.uniforms.get(&location.binding))
        else {
            return;
        };
        if uniform.ty != value.ty() {
            log::warn!(
                "uniform write ignored: @binding({}) is {} but got {}",
                location.binding,
                location.ty,
                value.ty()
            );
            return;
        }

        self.gpu.queue().write_buffer(&uniform.buffer, 0, value.as_bytes());
    }

    fn resize_backing_buffer(&mut self, width: u32, height: u32) {
        log::debug!("backing buffer resized to {width}x{height}");
        self.gpu.resize(winit::dpi::PhysicalSize::new(width, height));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = Some((x, y, width, height));
    }

    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> EngineResult<()> {
        let Some(program) = self.current else {
            log::warn!("draw skipped: no current program");
            return Ok(());
        };
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.draw_pass(program, first, count)
    }
}

fn shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

fn float_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Intersects a GL-style viewport with the render target, since wgpu rejects
/// viewports that leave it. `None` when nothing is left.
fn clamp_viewport(
    (x, y, width, height): (i32, i32, u32, u32),
    (target_w, target_h): (u32, u32),
) -> Option<(f32, f32, f32, f32)> {
    let x0 = (x as f32).clamp(0.0, target_w as f32);
    let y0 = (y as f32).clamp(0.0, target_h as f32);
    let x1 = (x as f32 + width as f32).clamp(0.0, target_w as f32);
    let y1 = (y as f32 + height as f32).clamp(0.0, target_h as f32);

    (x1 > x0 && y1 > y0).then(|| (x0, y0, x1 - x0, y1 - y0))
}
