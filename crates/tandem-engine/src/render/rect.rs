use bytemuck::{Pod, Zeroable};

use crate::draw::{DrawCmd, DrawList};

use super::common::{premul_alpha_blend, primitive_state};
use super::{RenderCtx, RenderTarget};

const SHADER: &str = r#"
struct Frame {
    // 2 / logical target size, so logical px map straight to NDC.
    ndc_scale: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;

struct Instance {
    @location(0) origin: vec2<f32>,
    @location(1) size: vec2<f32>,
    @location(2) color: vec4<f32>,
};

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

// Two triangles per instance, corners derived from the vertex index.
@vertex
fn vs_main(@builtin(vertex_index) i: u32, inst: Instance) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 0.0), vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0), vec2<f32>(0.0, 1.0),
    );
    let p = inst.origin + corners[i] * inst.size;
    var out: VsOut;
    out.pos = vec4<f32>(p.x * frame.ndc_scale.x - 1.0, 1.0 - p.y * frame.ndc_scale.y, 0.0, 1.0);
    out.color = inst.color;
    return out;
}

@fragment
fn fs_main(v: VsOut) -> @location(0) vec4<f32> {
    return v.color;
}
"#;

const VERTICES_PER_RECT: u32 = 6;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniform {
    ndc_scale: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct RectInstance {
    origin: [f32; 2],
    size: [f32; 2],
    color: [f32; 4],
}

impl RectInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Pipeline plus the uniform it reads, built together for one target format.
struct Pipeline {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Pipeline {
    fn new(ctx: &RenderCtx<'_>) -> Self {
        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tandem rect shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let uniform_size = std::mem::size_of::<FrameUniform>() as u64;
        let layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tandem rect bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let uniform = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tandem rect frame uniform"),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tandem rect bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() }],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tandem rect pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tandem rect pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[RectInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive_state(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self { format: ctx.format, pipeline, uniform, bind_group }
    }
}

/// Instanced solid-rectangle renderer.
///
/// Geometry is in logical pixels. GPU objects are created on first use and
/// rebuilt when the target format changes; the instance buffer only grows.
#[derive(Default)]
pub struct RectRenderer {
    pipeline: Option<Pipeline>,
    instances: Option<(wgpu::Buffer, usize)>,
    scratch: Vec<RectInstance>,
}

impl RectRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every visible rect in `draw_list`, back to front, into `target`.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, draw_list: &mut DrawList) {
        self.scratch.clear();
        for item in draw_list.iter_in_paint_order() {
            let DrawCmd::Rect(cmd) = &item.cmd;
            if cmd.rect.is_empty() || cmd.color.a <= 0.0 {
                continue;
            }
            let c = cmd.color;
            self.scratch.push(RectInstance {
                origin: [cmd.rect.origin.x, cmd.rect.origin.y],
                size: [cmd.rect.size.x, cmd.rect.size.y],
                color: [c.r, c.g, c.b, c.a],
            });
        }
        if self.scratch.is_empty() {
            return;
        }

        if self.pipeline.as_ref().is_none_or(|p| p.format != ctx.format) {
            self.pipeline = Some(Pipeline::new(ctx));
        }
        let Some(pipeline) = self.pipeline.as_ref() else { return };

        let frame = FrameUniform {
            ndc_scale: [2.0 / ctx.logical_size.width.max(1.0), 2.0 / ctx.logical_size.height.max(1.0)],
            _pad: [0.0; 2],
        };
        ctx.queue.write_buffer(&pipeline.uniform, 0, bytemuck::bytes_of(&frame));

        let count = self.scratch.len();
        if self.instances.as_ref().is_none_or(|(_, cap)| *cap < count) {
            let cap = count.next_power_of_two().max(64);
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tandem rect instances"),
                size: (cap * std::mem::size_of::<RectInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.instances = Some((buffer, cap));
        }
        let Some((instances, _)) = self.instances.as_ref() else { return };
        ctx.queue.write_buffer(instances, 0, bytemuck::cast_slice(&self.scratch));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tandem rect pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pipeline.pipeline);
        rpass.set_bind_group(0, &pipeline.bind_group, &[]);
        rpass.set_vertex_buffer(0, instances.slice(..));
        rpass.draw(0..VERTICES_PER_RECT, 0..count as u32);
    }
}
