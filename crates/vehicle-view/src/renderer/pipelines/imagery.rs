// Textured ground quads for map imagery, one GPU texture per tile.

use super::{node_mvp, uniform_layout, UniformSlot};
use crate::camera::Camera;
use crate::scene::imagery::{TileKey, TileQuad};
use crate::scene::{FeatureKey, SceneNodeSet};
use std::collections::{HashMap, HashSet};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

struct TileGpu {
    _texture: wgpu::Texture,
    bind: wgpu::BindGroup,
    vb: wgpu::Buffer,
}

pub struct ImageryPipeline {
    pipeline: wgpu::RenderPipeline,
    tile_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform: UniformSlot,
    tiles: HashMap<TileKey, TileGpu>,
    generation: Option<u64>,
}

impl ImageryPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let frame_layout = uniform_layout(device, "Imagery UBO Layout");
        let tile_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Imagery Tile Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Imagery Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Imagery WGSL"),
            source: wgpu::ShaderSource::Wgsl(IMAGERY_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Imagery Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &tile_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Imagery Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TileVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
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
            primitive: wgpu::PrimitiveState::default(),
            // Drawn first and never occludes the grid lying in the same plane.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            uniform: UniformSlot::new(device, &frame_layout, "Imagery UBO"),
            tile_layout,
            sampler,
            tiles: HashMap::new(),
            generation: None,
        }
    }

    /// Syncs the texture cache with the imagery node: uploads new tiles and
    /// drops tiles the node no longer references.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneNodeSet,
        camera: &Camera,
    ) {
        let Some(node) = scene.node(FeatureKey::Imagery) else {
            if !self.tiles.is_empty() {
                log::debug!("Releasing {} imagery textures", self.tiles.len());
            }
            self.tiles.clear();
            self.generation = None;
            return;
        };

        if self.generation != Some(node.generation) {
            let wanted: HashSet<TileKey> = node.tiles.iter().map(|q| q.key).collect();
            self.tiles.retain(|k, _| wanted.contains(k));
            for quad in &node.tiles {
                if !self.tiles.contains_key(&quad.key) {
                    let gpu = self.upload(device, queue, quad);
                    self.tiles.insert(quad.key, gpu);
                }
            }
            self.generation = Some(node.generation);
        }

        self.uniform
            .write(queue, node_mvp(camera, node.transform));
    }

    fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue, quad: &TileQuad) -> TileGpu {
        let image = &quad.image;
        let size = wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Imagery Tile"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if image.width > 0 && image.rgba.len() == (image.width * image.height * 4) as usize {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &image.rgba,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * image.width),
                    rows_per_image: Some(image.height),
                },
                size,
            );
        } else {
            log::warn!("Tile {:?} has a malformed image; drawing it blank", quad.key);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Imagery Tile Bind Group"),
            layout: &self.tile_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        // Image rows run north to south.
        let [sw, se, ne, nw] = quad.corners.map(|c| c.as_vec3().to_array());
        let v = |position, uv| TileVertex { position, uv };
        let verts = [
            v(sw, [0.0, 1.0]),
            v(se, [1.0, 1.0]),
            v(ne, [1.0, 0.0]),
            v(sw, [0.0, 1.0]),
            v(ne, [1.0, 0.0]),
            v(nw, [0.0, 0.0]),
        ];
        let vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Imagery Tile VB"),
            contents: bytemuck::cast_slice(&verts),
            usage: wgpu::BufferUsages::VERTEX,
        });

        TileGpu {
            _texture: texture,
            bind,
            vb,
        }
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, scene: &SceneNodeSet) {
        if !scene.is_attached(FeatureKey::Imagery) || self.tiles.is_empty() {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.uniform.bind, &[]);
        for tile in self.tiles.values() {
            rpass.set_bind_group(1, &tile.bind, &[]);
            rpass.set_vertex_buffer(0, tile.vb.slice(..));
            rpass.draw(0..6, 0..1);
        }
    }
}

pub const IMAGERY_WGSL: &str = r#"
struct Frame {
    mvp: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var tile_tex: texture_2d<f32>;
@group(1) @binding(1) var tile_smp: sampler;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec3<f32>, @location(1) uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = frame.mvp * vec4<f32>(pos, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSample(tile_tex, tile_smp, in.uv);
    return vec4<f32>(c.rgb, 0.85);
}
"#;
