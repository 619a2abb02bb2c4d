pub mod imagery;
pub mod lines;

use crate::camera::Camera;
use glam::{DMat4, Mat4};

/// Clip transform for a node whose vertices are uploaded node-local in
/// `f32`. The eye offset is folded in while still in `f64`.
pub fn node_mvp(camera: &Camera, transform: DMat4) -> Mat4 {
    let eye_relative = DMat4::from_translation(-camera.eye()) * transform;
    camera.view_proj_relative() * eye_relative.as_mat4()
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NodeUniform {
    pub mvp: Mat4,
}

const _: [(); 64] = [(); core::mem::size_of::<NodeUniform>()];

pub(crate) fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<NodeUniform>() as u64,
                ),
            },
            count: None,
        }],
    })
}

/// Uniform buffer plus its bind group.
pub(crate) struct UniformSlot {
    pub buffer: wgpu::Buffer,
    pub bind: wgpu::BindGroup,
}

impl UniformSlot {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<NodeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind }
    }

    pub fn write(&self, queue: &wgpu::Queue, mvp: Mat4) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&NodeUniform { mvp }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec3, Vec4};

    #[test]
    fn eye_offset_survives_large_coordinates() {
        let mut cam = Camera::new(1.0);
        let far = DVec3::new(400_000.0, 5_200_000.0, 30.0);
        cam.recenter(far, 0.0);
        let mvp = node_mvp(&cam, DMat4::from_translation(far));
        // The target sits at the centre of the screen.
        let clip = mvp * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-4);
        assert!((clip.y / clip.w).abs() < 1e-4);
    }
}
