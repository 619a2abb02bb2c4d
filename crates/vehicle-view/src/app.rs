use crate::{
    camera::CameraController,
    config::Config,
    driver::{Collaborators, RenderLoopDriver, Toggle},
    interaction::{PointerInput, Reaction},
    picking::Ray,
    renderer::Renderer,
    ui::{UiCommand, UiState},
};
use anyhow::Result;
use std::sync::Arc;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

/// Keyboard shortcuts. Bound keys are always consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding {
    /// Dismisses the menu, or abandons a move or target drag.
    Cancel,
    Commit,
    Recenter,
    TogglePanel,
    Toggle(Toggle),
}

pub fn key_binding(code: KeyCode) -> Option<KeyBinding> {
    Some(match code {
        KeyCode::Escape => KeyBinding::Cancel,
        KeyCode::Enter | KeyCode::NumpadEnter => KeyBinding::Commit,
        KeyCode::KeyR => KeyBinding::Recenter,
        KeyCode::KeyH => KeyBinding::TogglePanel,
        KeyCode::Digit1 => KeyBinding::Toggle(Toggle::Sensor2d),
        KeyCode::Digit2 => KeyBinding::Toggle(Toggle::Sensor3d),
        KeyCode::KeyC => KeyBinding::Toggle(Toggle::SensorColor),
        KeyCode::KeyT => KeyBinding::Toggle(Toggle::Target),
        KeyCode::KeyG => KeyBinding::Toggle(Toggle::Grid),
        KeyCode::KeyF => KeyBinding::Toggle(Toggle::FollowCamera),
        _ => return None,
    })
}

pub struct App {
    pub renderer: Renderer,
    pub driver: RenderLoopDriver,
    pub camera_controller: CameraController,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub ui: UiState,
    cursor: Option<PhysicalPosition<f64>>,
    shift: bool,
    scale_factor: f64,
}

impl App {
    pub async fn new(window: Arc<Window>, collaborators: Collaborators, config: &Config) -> Result<Self> {
        let renderer = Renderer::new(window.clone()).await?;
        let scale_factor = window.scale_factor();
        let logical = renderer.gfx.size.to_logical::<f32>(scale_factor);

        let settings = config.view_settings(
            &collaborators.imagery,
            &collaborators.models,
            [logical.width, logical.height],
        );
        let driver = RenderLoopDriver::new(collaborators, settings);

        let mut camera_controller = CameraController::new();
        camera_controller.set_viewport_height(renderer.gfx.size.height as f32);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            renderer,
            driver,
            camera_controller,
            egui_ctx,
            egui_state,
            ui: UiState::new(),
            cursor: None,
            shift: false,
            scale_factor,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.camera_controller
                .set_viewport_height(new_size.height as f32);
            let logical = new_size.to_logical::<f64>(self.scale_factor);
            self.driver
                .resize(logical.width.round() as u32, logical.height.round() as u32);
        }
    }

    /// Pick ray under the cursor, in the same logical units as the HUD.
    fn cursor_ray(&self) -> Option<Ray> {
        let pos = self.cursor?.to_logical::<f32>(self.scale_factor);
        let viewport = self.driver.hud().layout().viewport;
        Some(
            self.driver
                .camera()
                .ray([pos.x, pos.y], [viewport.x, viewport.y]),
        )
    }

    /// Returns `true` when the event was consumed.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        match event {
            WindowEvent::ModifiersChanged(m) => {
                self.shift = m.state().shift_key();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(*position);
                let ray = self.cursor_ray();
                self.driver.hover(ray);
                if let Some(ray) = ray {
                    self.driver.pointer(PointerInput::Move(ray));
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.driver.hover(None);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                let reaction = match state {
                    ElementState::Pressed => match self.cursor_ray() {
                        Some(ray) => self.driver.pointer(PointerInput::Press {
                            ray,
                            pick: self.shift,
                        }),
                        None => Reaction::Ignored,
                    },
                    ElementState::Released => self.driver.pointer(PointerInput::Release),
                };
                if reaction == Reaction::MenuOpened {
                    if let Some(p) = self.cursor {
                        let p = p.to_logical::<f32>(self.scale_factor);
                        self.ui.open_menu_at(egui::pos2(p.x, p.y));
                    }
                }
                if *state == ElementState::Pressed && reaction != Reaction::Ignored {
                    return true;
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if self.handle_key(*code) {
                    return true;
                }
            }
            WindowEvent::Focused(false) => {
                self.driver.cancel();
            }
            WindowEvent::Resized(physical_size) => {
                self.resize(*physical_size);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                self.resize(self.renderer.gfx.size);
            }
            _ => {}
        }

        self.camera_controller
            .handle_event(event, self.driver.camera_mut());
        false
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        let Some(binding) = key_binding(code) else {
            return false;
        };
        match binding {
            KeyBinding::Cancel => {
                if self.driver.pending_menu().is_some() {
                    self.driver.dismiss_menu();
                } else {
                    self.driver.cancel();
                }
            }
            KeyBinding::Commit => {
                self.driver.commit();
            }
            KeyBinding::Recenter => self.driver.recenter(),
            KeyBinding::TogglePanel => self.ui.toggle_panel(),
            KeyBinding::Toggle(toggle) => {
                let on = self.driver.toggle(toggle);
                log::info!("{}: {}", toggle.label(), if on { "on" } else { "off" });
            }
        }
        true
    }

    fn apply(&mut self, commands: Vec<UiCommand>) {
        for command in commands {
            match command {
                UiCommand::Toggle(toggle, on) => {
                    self.driver.set_toggle(toggle, on);
                }
                UiCommand::Frame(frame) => self.driver.set_reference_frame(frame),
                UiCommand::MapSource(source) => {
                    self.driver.select_map_source(source);
                }
                UiCommand::VehicleModel(index) => {
                    self.driver.select_vehicle_model(index);
                }
                UiCommand::Recenter => self.driver.recenter(),
                UiCommand::Menu(action) => {
                    self.driver.apply_menu(action);
                }
                UiCommand::DismissMenu => self.driver.dismiss_menu(),
                UiCommand::ClearAll => self.driver.clear_all(),
            }
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        self.driver.frame();

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(
            &swap_view,
            self.driver.scene(),
            self.driver.camera(),
            self.driver.hud().theme(),
        );

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);
        let commands = self.ui.draw(&self.egui_ctx, &self.driver);
        let egui_output = self.egui_ctx.end_frame();
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);

        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        self.apply(commands);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_is_always_a_cancel() {
        assert_eq!(key_binding(KeyCode::Escape), Some(KeyBinding::Cancel));
        assert_eq!(key_binding(KeyCode::NumpadEnter), Some(KeyBinding::Commit));
        assert_eq!(
            key_binding(KeyCode::KeyG),
            Some(KeyBinding::Toggle(Toggle::Grid))
        );
        assert_eq!(key_binding(KeyCode::KeyQ), None);
    }
}
