//! Screen-space status overlay: content and layout, independent of drawing.

use crate::frames::CoordinateTransformer;
use crate::pose::{ReferenceFrame, VehiclePose};
use egui::{pos2, vec2, Pos2, Rect, Vec2};
use glam::DVec3;

pub const STATUS_BAR_HEIGHT: f32 = 30.0;
pub const SCALE_BAR_MAX_PX: f32 = 150.0;
const MARGIN: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HudTheme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub length_px: f32,
    pub meters: f64,
    pub label: String,
}

impl ScaleBar {
    /// Longest 1/2/5 x 10^k meter bar that fits in `SCALE_BAR_MAX_PX`.
    pub fn for_resolution(meters_per_pixel: f64) -> Option<Self> {
        if !(meters_per_pixel.is_finite() && meters_per_pixel > 0.0) {
            return None;
        }
        let max_m = SCALE_BAR_MAX_PX as f64 * meters_per_pixel;
        let base = 10f64.powi(max_m.log10().floor() as i32);
        let meters = [5.0, 2.0, 1.0]
            .into_iter()
            .map(|m| m * base)
            .find(|m| *m <= max_m * (1.0 + 1e-9))?;
        let label = if meters >= 1000.0 {
            format!("{} km", meters / 1000.0)
        } else {
            format!("{} m", meters)
        };
        Some(Self {
            length_px: (meters / meters_per_pixel) as f32,
            meters,
            label,
        })
    }
}

/// Where each HUD element goes, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudLayout {
    pub viewport: Vec2,
    pub status_bar: Rect,
    /// Left end of the scale bar baseline.
    pub scale_bar: Pos2,
    /// RGB then depth, bottom-right.
    pub sensor_windows: [Rect; 2],
}

impl HudLayout {
    pub fn new(width: f32, height: f32) -> Self {
        let w = width.max(1.0);
        let h = height.max(1.0);
        let win = vec2(w / 4.0, w / 4.0 * 3.0 / 4.0);
        let rgb = Rect::from_min_size(pos2(w - win.x - MARGIN, h - win.y - MARGIN), win);
        let depth = Rect::from_min_size(pos2(rgb.min.x - win.x - MARGIN, rgb.min.y), win);
        Self {
            viewport: vec2(w, h),
            status_bar: Rect::from_min_size(Pos2::ZERO, vec2(w, STATUS_BAR_HEIGHT)),
            scale_bar: pos2(MARGIN * 2.0, h - MARGIN * 2.0),
            sensor_windows: [rgb, depth],
        }
    }
}

pub struct HudOverlay {
    layout: HudLayout,
    status: String,
    cursor: String,
    scale: Option<ScaleBar>,
    theme: HudTheme,
    sensor_windows: bool,
}

impl HudOverlay {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            layout: HudLayout::new(width, height),
            status: "Waiting for vehicle state".to_owned(),
            cursor: String::new(),
            scale: None,
            theme: HudTheme::Dark,
            sensor_windows: false,
        }
    }

    /// Layout only; content is untouched.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.layout = HudLayout::new(width, height);
    }

    pub fn layout(&self) -> &HudLayout {
        &self.layout
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn scale_bar(&self) -> Option<&ScaleBar> {
        self.scale.as_ref()
    }

    pub fn theme(&self) -> HudTheme {
        self.theme
    }

    pub fn set_theme(&mut self, street_map: bool) {
        self.theme = if street_map {
            HudTheme::Light
        } else {
            HudTheme::Dark
        };
    }

    pub fn set_sensor_windows(&mut self, enabled: bool) {
        self.sensor_windows = enabled;
    }

    /// The 2D sensor windows are part of the overlay.
    pub fn sensor_windows_attached(&self) -> bool {
        self.sensor_windows
    }

    pub fn update_pose(&mut self, pose: &VehiclePose, transformer: &CoordinateTransformer) {
        let [roll, pitch, yaw] = pose.attitude.to_degrees();
        let attitude = format!("r = {roll:.1}  p = {pitch:.1}  y = {yaw:.1}");
        self.status = match transformer.frame() {
            ReferenceFrame::LocalNed => {
                let p = pose.position;
                format!(
                    "x = {:.2}  y = {:.2}  z = {:.2}    {attitude}",
                    p.x, p.y, p.z
                )
            }
            ReferenceFrame::Global => match transformer.global_pose(pose) {
                Ok(g) => format!(
                    "lat = {:.6}  lon = {:.6}  alt = {:.1} m    {attitude}    {} E {:.1} N {:.1}",
                    g.geodetic.lat_deg,
                    g.geodetic.lon_deg,
                    g.geodetic.alt_m,
                    g.utm.zone,
                    g.utm.easting,
                    g.utm.northing
                ),
                Err(e) => format!("{e}    {attitude}"),
            },
        };
    }

    /// Ground position under the pointer, local NED.
    pub fn update_cursor(&mut self, ground: Option<DVec3>, transformer: &CoordinateTransformer) {
        self.cursor = match (ground, transformer.frame()) {
            (None, _) => String::new(),
            (Some(p), ReferenceFrame::LocalNed) => format!("cursor x = {:.2}  y = {:.2}", p.x, p.y),
            (Some(p), ReferenceFrame::Global) => match transformer.local_to_geodetic(p) {
                Ok(g) => format!("cursor lat = {:.6}  lon = {:.6}", g.lat_deg, g.lon_deg),
                Err(_) => String::new(),
            },
        };
    }

    pub fn update_scale(&mut self, meters_per_pixel: f64) {
        self.scale = ScaleBar::for_resolution(meters_per_pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Attitude, VehicleState};
    use geodesy::Geodetic;

    #[test]
    fn scale_bar_picks_round_lengths() {
        let bar = ScaleBar::for_resolution(1.0).unwrap();
        assert_eq!(bar.meters, 100.0);
        assert_eq!(bar.label, "100 m");
        assert!((bar.length_px - 100.0).abs() < 1e-4);

        let bar = ScaleBar::for_resolution(3.4).unwrap();
        assert_eq!(bar.meters, 500.0);

        let bar = ScaleBar::for_resolution(10.0).unwrap();
        assert_eq!(bar.label, "1 km");

        let bar = ScaleBar::for_resolution(0.3).unwrap();
        assert_eq!(bar.meters, 20.0);
        assert!(bar.length_px <= SCALE_BAR_MAX_PX);
    }

    #[test]
    fn scale_bar_rejects_degenerate_input() {
        assert!(ScaleBar::for_resolution(0.0).is_none());
        assert!(ScaleBar::for_resolution(f64::NAN).is_none());
    }

    #[test]
    fn layout_places_sensor_windows_bottom_right() {
        let l = HudLayout::new(1200.0, 800.0);
        let [rgb, depth] = l.sensor_windows;
        assert_eq!(rgb.width(), 300.0);
        assert_eq!(rgb.height(), 225.0);
        assert_eq!(rgb.max.x, 1190.0);
        assert_eq!(rgb.max.y, 790.0);
        assert!(depth.max.x < rgb.min.x);
        assert_eq!(l.status_bar.height(), STATUS_BAR_HEIGHT);
    }

    #[test]
    fn resize_keeps_content() {
        let mut hud = HudOverlay::new(800.0, 600.0);
        hud.update_scale(1.0);
        let before = hud.status().to_owned();
        hud.resize(1024.0, 768.0);
        assert_eq!(hud.status(), before);
        assert!(hud.scale_bar().is_some());
        assert_eq!(hud.layout().viewport, vec2(1024.0, 768.0));
    }

    fn pose(tf: &mut CoordinateTransformer, fix: Option<Geodetic>) -> VehiclePose {
        tf.ingest(&VehicleState {
            local_ned: DVec3::new(1.0, 2.0, -3.0),
            attitude: Attitude::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            geodetic: fix,
        })
    }

    #[test]
    fn local_status_shows_position_and_degrees() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::LocalNed);
        let p = pose(&mut tf, None);
        let mut hud = HudOverlay::new(800.0, 600.0);
        hud.update_pose(&p, &tf);
        assert!(hud.status().contains("x = 1.00"));
        assert!(hud.status().contains("z = -3.00"));
        assert!(hud.status().contains("y = 90.0"));
    }

    #[test]
    fn global_status_degrades_without_fix() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::Global);
        let p = pose(&mut tf, None);
        let mut hud = HudOverlay::new(800.0, 600.0);
        hud.update_pose(&p, &tf);
        assert!(hud.status().contains("unavailable"));

        let p = pose(&mut tf, Some(Geodetic::new(47.3977, 8.5456, 488.0)));
        hud.update_pose(&p, &tf);
        assert!(hud.status().contains("lat = 47.3977"));
        assert!(hud.status().contains("32T"));
    }

    #[test]
    fn theme_follows_street_map() {
        let mut hud = HudOverlay::new(800.0, 600.0);
        hud.set_theme(true);
        assert_eq!(hud.theme(), HudTheme::Light);
        hud.set_theme(false);
        assert_eq!(hud.theme(), HudTheme::Dark);
    }
}
