//! GPU compositor: owns the context, the depth target and the scene
//! pipelines, and draws whatever is attached in the scene node set.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    pipelines::{imagery::ImageryPipeline, lines::LinePipeline},
    targets::Targets,
};
use crate::{camera::Camera, hud::HudTheme, scene::SceneNodeSet};
use std::sync::Arc;
use winit::window::Window;

pub fn clear_color(theme: HudTheme) -> wgpu::Color {
    match theme {
        HudTheme::Dark => wgpu::Color {
            r: 0.02,
            g: 0.03,
            b: 0.05,
            a: 1.0,
        },
        HudTheme::Light => wgpu::Color {
            r: 0.78,
            g: 0.80,
            b: 0.82,
            a: 1.0,
        },
    }
}

pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    pub lines: LinePipeline,
    pub imagery: ImageryPipeline,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let targets = Targets::new(&gfx.device, gfx.size);
        let lines = LinePipeline::new(&gfx.device, gfx.config.format, targets.depth_fmt);
        let imagery = ImageryPipeline::new(&gfx.device, gfx.config.format, targets.depth_fmt);
        let egui_renderer =
            egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            targets,
            lines,
            imagery,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    pub fn render(
        &mut self,
        swap_view: &wgpu::TextureView,
        scene: &SceneNodeSet,
        camera: &Camera,
        theme: HudTheme,
    ) {
        self.imagery
            .prepare(&self.gfx.device, &self.gfx.queue, scene, camera);
        self.lines
            .prepare(&self.gfx.device, &self.gfx.queue, scene, camera);

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(theme)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Imagery first so ground lines draw over it.
            self.imagery.draw(&mut pass, scene);
            self.lines.draw(&mut pass, scene);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
