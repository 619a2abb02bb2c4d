// Lines, line strips and points for every non-imagery scene node.

use super::{node_mvp, uniform_layout, UniformSlot};
use crate::camera::Camera;
use crate::scene::{FeatureKey, Geometry, Primitive, SceneNode, SceneNodeSet};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const _: [(); 28] = [(); core::mem::size_of::<LineVertex>()];

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

fn vertices(g: &Geometry) -> Vec<LineVertex> {
    g.vertices
        .iter()
        .zip(&g.colors)
        .map(|(v, c)| LineVertex {
            position: v.as_vec3().to_array(),
            color: *c,
        })
        .collect()
}

struct PartGpu {
    primitive: Primitive,
    vb: wgpu::Buffer,
    count: u32,
}

struct NodeGpu {
    generation: u64,
    parts: Vec<PartGpu>,
    uniform: UniformSlot,
}

pub struct LinePipeline {
    lines: wgpu::RenderPipeline,
    strip: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    nodes: HashMap<FeatureKey, NodeGpu>,
}

impl LinePipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let layout = uniform_layout(device, "Scene Node UBO Layout");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines WGSL"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lines Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[LineVertex::layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_fmt,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: depth_fmt,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        };

        Self {
            lines: build("Line List Pipeline", wgpu::PrimitiveTopology::LineList),
            strip: build("Line Strip Pipeline", wgpu::PrimitiveTopology::LineStrip),
            points: build("Point List Pipeline", wgpu::PrimitiveTopology::PointList),
            layout,
            nodes: HashMap::new(),
        }
    }

    /// Uploads changed geometry and refreshes per-node transforms.
    /// Buffers of removed nodes are released; hidden nodes keep theirs.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneNodeSet,
        camera: &Camera,
    ) {
        self.nodes.retain(|key, _| scene.node(*key).is_some());

        for (key, node) in scene.attached() {
            if key == FeatureKey::Imagery {
                continue;
            }
            let stale = self
                .nodes
                .get(&key)
                .map_or(true, |gpu| gpu.generation != node.generation);
            if stale {
                let gpu = self.upload(device, key, node);
                self.nodes.insert(key, gpu);
            }
            if let Some(gpu) = self.nodes.get(&key) {
                gpu.uniform.write(queue, node_mvp(camera, node.transform));
            }
        }
    }

    fn upload(&self, device: &wgpu::Device, key: FeatureKey, node: &SceneNode) -> NodeGpu {
        let label = format!("{key:?}");
        let parts = node
            .parts
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| PartGpu {
                primitive: g.primitive,
                vb: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: bytemuck::cast_slice(&vertices(g)),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                count: g.vertices.len() as u32,
            })
            .collect();
        log::trace!("Uploaded {label} ({} vertices)", node.vertex_count());
        NodeGpu {
            generation: node.generation,
            parts,
            uniform: UniformSlot::new(device, &self.layout, &label),
        }
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, scene: &SceneNodeSet) {
        for (key, _) in scene.attached() {
            let Some(gpu) = self.nodes.get(&key) else {
                continue;
            };
            rpass.set_bind_group(0, &gpu.uniform.bind, &[]);
            for part in &gpu.parts {
                rpass.set_pipeline(match part.primitive {
                    Primitive::Lines => &self.lines,
                    Primitive::LineStrip => &self.strip,
                    Primitive::Points => &self.points,
                });
                rpass.set_vertex_buffer(0, part.vb.slice(..));
                rpass.draw(0..part.count, 0..1);
            }
        }
    }
}

pub const LINES_WGSL: &str = r#"
struct Node {
    mvp: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> node: Node;

struct VsIn {
    @location(0) pos: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(in: VsIn) -> VsOut {
    var out: VsOut;
    out.clip = node.mvp * vec4<f32>(in.pos, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;
