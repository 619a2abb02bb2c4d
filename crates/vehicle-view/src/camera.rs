use crate::picking::Ray;
use glam::{DMat3, DMat4, DVec3, Mat4};
use std::f64::consts::PI;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Distance `recenter` returns to, meters.
pub const CANONICAL_DISTANCE_M: f64 = 50.0;
/// Elevation `recenter` returns to, degrees.
pub const CANONICAL_ELEVATION_DEG: f64 = 30.0;

const MIN_ELEVATION_DEG: f64 = 1.0;
const MAX_ELEVATION_DEG: f64 = 89.0;

/// Orbit camera in ENU render space.
#[derive(Debug, Clone)]
pub struct Camera {
    // --- Orbital parameters ---
    /// The point (render meters) the camera orbits around.
    pub target: DVec3,
    /// Distance from the camera to the target (meters).
    pub radius_m: f64,
    /// Bearing of the camera as seen from the target, clockwise from north (radians).
    pub azimuth_rad: f64,
    /// Elevation above the horizontal plane through the target (radians).
    pub elevation_rad: f64,

    // --- Derived by `update()` ---
    eye: DVec3,

    // --- Projection ---
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near_m: f64,
    pub far_m: f64,
}

impl Camera {
    pub fn new(aspect: f64) -> Self {
        let mut camera = Self {
            target: DVec3::ZERO,
            radius_m: CANONICAL_DISTANCE_M,
            azimuth_rad: PI,
            elevation_rad: CANONICAL_ELEVATION_DEG.to_radians(),
            eye: DVec3::ZERO,
            fov_y_rad: 60f64.to_radians(),
            aspect,
            near_m: 0.1,
            far_m: 100_000.0,
        };
        camera.update();
        camera
    }

    /// Recalculates the eye position from the orbital parameters. Must be
    /// called after any of them change.
    pub fn update(&mut self) {
        self.elevation_rad = self.elevation_rad.clamp(
            MIN_ELEVATION_DEG.to_radians(),
            MAX_ELEVATION_DEG.to_radians(),
        );
        let (sin_az, cos_az) = self.azimuth_rad.sin_cos();
        let (sin_el, cos_el) = self.elevation_rad.sin_cos();
        let offset = DVec3::new(
            self.radius_m * cos_el * sin_az, // East
            self.radius_m * cos_el * cos_az, // North
            self.radius_m * sin_el,          // Up
        );
        self.eye = self.target + offset;
    }

    #[inline]
    pub fn eye(&self) -> DVec3 {
        self.eye
    }

    /// Camera basis: right, up, forward.
    fn basis(&self) -> DMat3 {
        let f = (self.target - self.eye).normalize();
        let s = f.cross(DVec3::Z).normalize();
        let u = s.cross(f);
        DMat3::from_cols(s, u, f)
    }

    /// Rotation-only view: vertices are uploaded relative to the eye.
    pub fn view_rotation(&self) -> Mat4 {
        DMat4::look_at_rh(DVec3::ZERO, self.target - self.eye, DVec3::Z).as_mat4()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad as f32,
            self.aspect as f32,
            self.near_m as f32,
            self.far_m as f32,
        )
    }

    /// View-projection for eye-relative coordinates.
    pub fn view_proj_relative(&self) -> Mat4 {
        self.projection() * self.view_rotation()
    }

    /// World ray through a pixel (origin top-left).
    pub fn ray(&self, px: [f32; 2], viewport: [f32; 2]) -> Ray {
        let w = viewport[0].max(1.0) as f64;
        let h = viewport[1].max(1.0) as f64;
        let ndc_x = 2.0 * px[0] as f64 / w - 1.0;
        let ndc_y = 1.0 - 2.0 * px[1] as f64 / h;
        let t = (self.fov_y_rad * 0.5).tan();
        let b = self.basis();
        let dir = b.x_axis * (ndc_x * t * self.aspect) + b.y_axis * (ndc_y * t) + b.z_axis;
        Ray::new(self.eye, dir)
    }

    /// Pixel position of a world point, `None` when behind the camera.
    pub fn project(&self, world: DVec3, viewport: [f32; 2]) -> Option<[f32; 2]> {
        let b = self.basis();
        let rel = world - self.eye;
        let depth = rel.dot(b.z_axis);
        if depth <= self.near_m {
            return None;
        }
        let t = (self.fov_y_rad * 0.5).tan();
        let ndc_x = rel.dot(b.x_axis) / (depth * t * self.aspect);
        let ndc_y = rel.dot(b.y_axis) / (depth * t);
        Some([
            ((ndc_x + 1.0) * 0.5 * viewport[0] as f64) as f32,
            ((1.0 - ndc_y) * 0.5 * viewport[1] as f64) as f32,
        ])
    }

    /// Ground meters covered by one pixel at the target distance.
    pub fn meters_per_pixel(&self, viewport_height_px: f32) -> f64 {
        2.0 * self.radius_m * (self.fov_y_rad * 0.5).tan() / viewport_height_px.max(1.0) as f64
    }

    /// Carries the camera along with the vehicle: translation plus heading change.
    pub fn follow(&mut self, delta: DVec3, delta_heading_rad: f64) {
        self.target += delta;
        self.azimuth_rad += delta_heading_rad;
        self.update();
    }

    /// Looks at `target` from behind `heading_rad` at the canonical distance and elevation.
    pub fn recenter(&mut self, target: DVec3, heading_rad: f64) {
        self.target = target;
        self.radius_m = CANONICAL_DISTANCE_M;
        self.elevation_rad = CANONICAL_ELEVATION_DEG.to_radians();
        self.azimuth_rad = heading_rad + PI;
        self.update();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }
}

/// Mouse orbit/zoom/pan.
#[derive(Debug, Default)]
pub struct CameraController {
    orbiting: bool,
    panning: bool,
    last_mouse: Option<(f64, f64)>,
    viewport_height: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height;
    }

    /// Handles window events and updates the camera.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &mut Camera) {
        match event {
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.orbiting = pressed,
                    MouseButton::Right => self.panning = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor((position.x, position.y), camera);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.handle_scroll(scroll, camera);
            }
            WindowEvent::Focused(false) => {
                self.orbiting = false;
                self.panning = false;
            }
            _ => {}
        }
    }

    fn handle_scroll(&mut self, delta: f32, camera: &mut Camera) {
        // Positive delta = scroll up = zoom in = decrease radius.
        let zoom = 1.1_f64.powf(-delta as f64);
        camera.radius_m = (camera.radius_m * zoom).clamp(2.0, 50_000.0);
        camera.update();
    }

    fn handle_cursor(&mut self, xy: (f64, f64), camera: &mut Camera) {
        if let Some(last) = self.last_mouse {
            let dx = xy.0 - last.0;
            let dy = xy.1 - last.1;
            if self.orbiting {
                camera.azimuth_rad -= dx * 0.005;
                camera.elevation_rad += dy * 0.005;
                camera.update();
            } else if self.panning {
                let mpp = camera.meters_per_pixel(self.viewport_height);
                let (sin_az, cos_az) = camera.azimuth_rad.sin_cos();
                // Horizontal right and away-from-camera directions.
                let right = DVec3::new(-cos_az, sin_az, 0.0);
                let forward = DVec3::new(-sin_az, -cos_az, 0.0);
                camera.target += (-right * dx + forward * dy) * mpp;
                camera.update();
            }
        }
        self.last_mouse = Some(xy);
    }
}
