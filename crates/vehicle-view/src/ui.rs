//! egui presentation: HUD painting, sensor windows, context menus and the
//! view panel. Nothing here mutates the engine directly; user choices are
//! returned as [`UiCommand`]s for the application to apply.

use crate::driver::{RenderLoopDriver, Toggle};
use crate::hud::{HudOverlay, HudTheme};
use crate::interaction::{Menu, MenuAction};
use crate::pose::ReferenceFrame;
use crate::scene::sensor::{RgbdFrame, MAX_DEPTH_M};
use crate::scene::shapes::depth_color;
use egui::{Align2, Color32, FontId, Id, LayerId, Order, Pos2, Rect, Stroke};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiCommand {
    Toggle(Toggle, bool),
    Frame(ReferenceFrame),
    MapSource(Option<usize>),
    VehicleModel(usize),
    Recenter,
    Menu(MenuAction),
    DismissMenu,
    ClearAll,
}

struct Palette {
    bar: Color32,
    text: Color32,
    accent: Color32,
}

fn palette(theme: HudTheme) -> Palette {
    match theme {
        HudTheme::Dark => Palette {
            bar: Color32::from_rgba_unmultiplied(10, 14, 20, 200),
            text: Color32::from_rgb(220, 230, 235),
            accent: Color32::from_rgb(45, 247, 255),
        },
        HudTheme::Light => Palette {
            bar: Color32::from_rgba_unmultiplied(245, 245, 240, 210),
            text: Color32::from_rgb(20, 20, 25),
            accent: Color32::from_rgb(30, 90, 200),
        },
    }
}

/// RGB8 pixels as an egui image; `None` for a malformed frame.
pub fn rgb_image(frame: &RgbdFrame) -> Option<egui::ColorImage> {
    let size = [frame.width as usize, frame.height as usize];
    (frame.rgb.len() == size[0] * size[1] * 3).then(|| egui::ColorImage::from_rgb(size, &frame.rgb))
}

/// Depth ramp, invalid samples black.
pub fn depth_image(frame: &RgbdFrame) -> Option<egui::ColorImage> {
    let size = [frame.width as usize, frame.height as usize];
    if frame.depth.len() != size[0] * size[1] {
        return None;
    }
    let pixels = frame
        .depth
        .iter()
        .map(|&d| {
            if RgbdFrame::depth_valid(d) {
                let [r, g, b, _] = depth_color(d / MAX_DEPTH_M);
                Color32::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
            } else {
                Color32::BLACK
            }
        })
        .collect();
    Some(egui::ColorImage { size, pixels })
}

pub fn parse_altitude(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Default)]
pub struct UiState {
    rgb: Option<egui::TextureHandle>,
    depth: Option<egui::TextureHandle>,
    sensor_generation: Option<u64>,
    /// Where the pending menu opens, screen points.
    menu_anchor: Option<Pos2>,
    altitude_text: Option<String>,
    show_panel: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            show_panel: true,
            ..Self::default()
        }
    }

    pub fn toggle_panel(&mut self) {
        self.show_panel = !self.show_panel;
    }

    /// Anchors the next context menu at the pointer.
    pub fn open_menu_at(&mut self, pos: Pos2) {
        self.menu_anchor = Some(pos);
        self.altitude_text = None;
    }

    pub fn draw(&mut self, ctx: &egui::Context, driver: &RenderLoopDriver) -> Vec<UiCommand> {
        let mut commands = Vec::new();
        let hud = driver.hud();

        draw_hud(ctx, hud);
        if hud.sensor_windows_attached() {
            self.draw_sensor_windows(ctx, driver);
        }
        draw_waypoint_labels(ctx, driver);

        if let Some(menu) = driver.pending_menu().copied() {
            self.draw_menu(ctx, menu, &mut commands);
        } else {
            self.altitude_text = None;
        }
        if self.show_panel {
            draw_view_panel(ctx, driver, &mut commands);
        }
        commands
    }

    fn draw_sensor_windows(&mut self, ctx: &egui::Context, driver: &RenderLoopDriver) {
        if let Some((generation, frame)) = driver.sensor_frame() {
            if self.sensor_generation != Some(generation) {
                self.sensor_generation = Some(generation);
                upload(ctx, &mut self.rgb, "sensor_rgb", rgb_image(frame));
                upload(ctx, &mut self.depth, "sensor_depth", depth_image(frame));
            }
        }

        let painter = ctx.layer_painter(LayerId::new(Order::Background, Id::new("sensor")));
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        let [rgb_rect, depth_rect] = driver.hud().layout().sensor_windows;
        for (rect, tex) in [(rgb_rect, &self.rgb), (depth_rect, &self.depth)] {
            match tex {
                Some(t) => {
                    painter.image(t.id(), rect, uv, Color32::WHITE);
                }
                None => {
                    painter.rect_filled(rect, 0.0, Color32::from_black_alpha(160));
                }
            }
            painter.rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::GRAY));
        }
    }

    fn draw_menu(&mut self, ctx: &egui::Context, menu: Menu, commands: &mut Vec<UiCommand>) {
        let anchor = self.menu_anchor.unwrap_or(Pos2::new(100.0, 100.0));
        egui::Area::new(Id::new("context_menu"))
            .fixed_pos(anchor)
            .order(Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| match menu {
                    Menu::Edit { index, .. } => {
                        ui.label(format!("Waypoint {}", index + 1));
                        if let Some(text) = self.altitude_text.as_mut() {
                            ui.horizontal(|ui| {
                                ui.label("Altitude (m)");
                                ui.text_edit_singleline(text);
                            });
                            let parsed = parse_altitude(text);
                            if parsed.is_none() {
                                ui.colored_label(Color32::RED, "Enter a number");
                            }
                            ui.horizontal(|ui| {
                                if ui.add_enabled(parsed.is_some(), egui::Button::new("OK")).clicked() {
                                    if let Some(alt) = parsed {
                                        commands.push(UiCommand::Menu(MenuAction::SetAltitude(alt)));
                                    }
                                }
                                if ui.button("Cancel").clicked() {
                                    commands.push(UiCommand::DismissMenu);
                                }
                            });
                            return;
                        }
                        if ui.button("Move").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::MoveWaypoint));
                        }
                        if ui.button("Set altitude...").clicked() {
                            self.altitude_text = Some(String::new());
                        }
                        if ui.button("Delete").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::DeleteWaypoint));
                        }
                        ui.separator();
                        if ui.button("Clear all waypoints").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::ClearAll));
                        }
                    }
                    Menu::Insert { target, .. } => {
                        if ui.button("Insert waypoint").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::InsertWaypoint));
                        }
                        if target && ui.button("Set target here").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::SetTarget));
                        }
                        ui.separator();
                        if ui.button("Clear all waypoints").clicked() {
                            commands.push(UiCommand::Menu(MenuAction::ClearAll));
                        }
                    }
                });
            });
    }
}

fn upload(
    ctx: &egui::Context,
    slot: &mut Option<egui::TextureHandle>,
    name: &str,
    image: Option<egui::ColorImage>,
) {
    let Some(image) = image else {
        log::debug!("Dropping malformed {name} frame");
        return;
    };
    match slot {
        Some(handle) => handle.set(image, egui::TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR)),
    }
}

fn draw_hud(ctx: &egui::Context, hud: &HudOverlay) {
    let colors = palette(hud.theme());
    let layout = hud.layout();
    let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("hud")));
    let font = FontId::monospace(14.0);

    painter.rect_filled(layout.status_bar, 0.0, colors.bar);
    painter.text(
        layout.status_bar.left_center() + egui::vec2(10.0, 0.0),
        Align2::LEFT_CENTER,
        hud.status(),
        font.clone(),
        colors.text,
    );
    if !hud.cursor().is_empty() {
        painter.text(
            layout.status_bar.right_center() - egui::vec2(10.0, 0.0),
            Align2::RIGHT_CENTER,
            hud.cursor(),
            font.clone(),
            colors.text,
        );
    }

    if let Some(bar) = hud.scale_bar() {
        let a = layout.scale_bar;
        let b = a + egui::vec2(bar.length_px, 0.0);
        let stroke = Stroke::new(2.0, colors.accent);
        painter.line_segment([a, b], stroke);
        for end in [a, b] {
            painter.line_segment([end, end - egui::vec2(0.0, 6.0)], stroke);
        }
        painter.text(
            a - egui::vec2(0.0, 8.0),
            Align2::LEFT_BOTTOM,
            &bar.label,
            font,
            colors.text,
        );
    }
}

fn draw_waypoint_labels(ctx: &egui::Context, driver: &RenderLoopDriver) {
    if !driver.toggles().waypoints {
        return;
    }
    let colors = palette(driver.hud().theme());
    let viewport = driver.hud().layout().viewport;
    let painter = ctx.layer_painter(LayerId::new(Order::Background, Id::new("labels")));
    for (i, p) in driver.waypoint_markers() {
        if let Some([x, y]) = driver.camera().project(p, [viewport.x, viewport.y]) {
            painter.text(
                Pos2::new(x + 8.0, y - 8.0),
                Align2::LEFT_BOTTOM,
                format!("{}", i + 1),
                FontId::proportional(13.0),
                colors.text,
            );
        }
    }
}

fn draw_view_panel(ctx: &egui::Context, driver: &RenderLoopDriver, commands: &mut Vec<UiCommand>) {
    egui::Window::new("View")
        .anchor(Align2::RIGHT_TOP, egui::vec2(-10.0, 40.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            let toggles = driver.toggles();
            for toggle in Toggle::ALL {
                let mut on = toggles.get(toggle);
                if ui.checkbox(&mut on, toggle.label()).changed() {
                    commands.push(UiCommand::Toggle(toggle, on));
                }
            }
            ui.separator();

            let frame = driver.transformer().frame();
            egui::ComboBox::from_label("Frame")
                .selected_text(frame.label())
                .show_ui(ui, |ui| {
                    for f in [ReferenceFrame::LocalNed, ReferenceFrame::Global] {
                        if ui.selectable_label(f == frame, f.label()).clicked() && f != frame {
                            commands.push(UiCommand::Frame(f));
                        }
                    }
                });

            let source = driver.map_source();
            let catalog = driver.imagery_catalog();
            let current = source
                .and_then(|i| catalog.get(i))
                .map_or("None", |s| s.name());
            egui::ComboBox::from_label("Map")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    if ui.selectable_label(source.is_none(), "None").clicked() {
                        commands.push(UiCommand::MapSource(None));
                    }
                    for (i, name) in catalog.names().enumerate() {
                        if ui.selectable_label(source == Some(i), name).clicked() {
                            commands.push(UiCommand::MapSource(Some(i)));
                        }
                    }
                });

            let models = driver.models();
            let model = driver.vehicle_model();
            egui::ComboBox::from_label("Vehicle")
                .selected_text(models.get(model).map_or("", |m| m.name))
                .show_ui(ui, |ui| {
                    for (i, name) in models.names().enumerate() {
                        if ui.selectable_label(model == i, name).clicked() {
                            commands.push(UiCommand::VehicleModel(i));
                        }
                    }
                });
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Recenter").clicked() {
                    commands.push(UiCommand::Recenter);
                }
                if ui
                    .add_enabled(!driver.waypoints().is_empty(), egui::Button::new("Clear waypoints"))
                    .clicked()
                {
                    commands.push(UiCommand::ClearAll);
                }
            });
            ui.label(format!("{} waypoints", driver.waypoints().len()));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::sensor::PinholeIntrinsics;

    fn frame(w: u32, h: u32) -> RgbdFrame {
        RgbdFrame {
            width: w,
            height: h,
            rgb: vec![200; (w * h * 3) as usize],
            depth: (0..w * h).map(|i| i as f32 * 0.5).collect(),
            intrinsics: PinholeIntrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: w as f32 / 2.0,
                cy: h as f32 / 2.0,
            },
        }
    }

    #[test]
    fn sensor_images_match_frame_size() {
        let f = frame(4, 3);
        let rgb = rgb_image(&f).unwrap();
        assert_eq!(rgb.size, [4, 3]);
        assert_eq!(rgb.pixels[0], Color32::from_rgb(200, 200, 200));
        let depth = depth_image(&f).unwrap();
        assert_eq!(depth.pixels.len(), 12);
        // Zero depth is invalid.
        assert_eq!(depth.pixels[0], Color32::BLACK);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let mut f = frame(4, 3);
        f.rgb.pop();
        f.depth.pop();
        assert!(rgb_image(&f).is_none());
        assert!(depth_image(&f).is_none());
    }

    #[test]
    fn altitude_parsing() {
        assert_eq!(parse_altitude(" 42.5 "), Some(42.5));
        assert_eq!(parse_altitude("-3"), Some(-3.0));
        assert_eq!(parse_altitude("abc"), None);
        assert_eq!(parse_altitude("inf"), None);
    }

    #[test]
    fn palettes_differ_by_theme() {
        assert_ne!(palette(HudTheme::Dark).bar, palette(HudTheme::Light).bar);
    }
}
