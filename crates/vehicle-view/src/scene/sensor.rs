//! RGB-D sensor frames and their 3D back-projection.

use super::shapes::depth_color;
use super::{Color, Geometry, Primitive};
use crossbeam_channel::Receiver;
use glam::DVec3;
use rayon::prelude::*;

/// Depths beyond this are treated as invalid, meters.
pub const MAX_DEPTH_M: f32 = 10.0;
/// Pixel stride used when back-projecting.
pub const CLOUD_STRIDE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

/// One synchronised color + depth image pair from a forward-looking camera
/// mounted at the vehicle origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbdFrame {
    pub width: u32,
    pub height: u32,
    /// RGB8, row-major.
    pub rgb: Vec<u8>,
    /// Meters, row-major; zero or NaN marks missing data.
    pub depth: Vec<f32>,
    pub intrinsics: PinholeIntrinsics,
}

impl RgbdFrame {
    pub fn is_consistent(&self) -> bool {
        let n = self.width as usize * self.height as usize;
        self.rgb.len() == n * 3 && self.depth.len() == n
    }

    pub fn depth_valid(d: f32) -> bool {
        d.is_finite() && d > 0.0 && d <= MAX_DEPTH_M
    }
}

/// Optional provider of RGB-D frames.
pub trait SensorSource {
    /// Newest frame since the last call, if any.
    fn latest(&mut self) -> Option<RgbdFrame>;
}

/// Sensor source fed from another thread.
pub struct ChannelSensorSource {
    rx: Receiver<RgbdFrame>,
}

impl ChannelSensorSource {
    pub fn new(rx: Receiver<RgbdFrame>) -> Self {
        Self { rx }
    }
}

impl SensorSource for ChannelSensorSource {
    fn latest(&mut self) -> Option<RgbdFrame> {
        self.rx.try_iter().last()
    }
}

/// Back-projects every `stride`-th pixel into body FRD coordinates.
///
/// The optical frame is x right, y down, z forward, so body = (z, x, y).
pub fn back_project(frame: &RgbdFrame, stride: usize, use_color: bool) -> Vec<(DVec3, Color)> {
    if !frame.is_consistent() {
        log::warn!(
            "Dropping RGB-D frame with mismatched buffers ({}x{})",
            frame.width,
            frame.height
        );
        return Vec::new();
    }
    let stride = stride.max(1);
    let w = frame.width as usize;
    let h = frame.height as usize;
    let k = frame.intrinsics;

    (0..h.div_ceil(stride))
        .into_par_iter()
        .flat_map_iter(|r| {
            let v = r * stride;
            (0..w).step_by(stride).filter_map(move |u| {
                let i = v * w + u;
                let d = frame.depth[i];
                if !RgbdFrame::depth_valid(d) {
                    return None;
                }
                let x = (u as f32 - k.cx) * d / k.fx;
                let y = (v as f32 - k.cy) * d / k.fy;
                let body = DVec3::new(d as f64, x as f64, y as f64);
                let color = if use_color {
                    let px = &frame.rgb[i * 3..i * 3 + 3];
                    [
                        px[0] as f32 / 255.0,
                        px[1] as f32 / 255.0,
                        px[2] as f32 / 255.0,
                        1.0,
                    ]
                } else {
                    depth_color(d / MAX_DEPTH_M)
                };
                Some((body, color))
            })
        })
        .collect()
}

/// Point geometry for the cloud, already placed in render space by `place`.
pub fn cloud_geometry(points: &[(DVec3, Color)], place: impl Fn(DVec3) -> DVec3) -> Geometry {
    let mut g = Geometry::new(Primitive::Points);
    g.vertices.reserve(points.len());
    g.colors.reserve(points.len());
    for (p, c) in points {
        g.push(place(*p), *c);
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: u32, h: u32, depth: f32) -> RgbdFrame {
        let n = (w * h) as usize;
        RgbdFrame {
            width: w,
            height: h,
            rgb: vec![128; n * 3],
            depth: vec![depth; n],
            intrinsics: PinholeIntrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: w as f32 / 2.0,
                cy: h as f32 / 2.0,
            },
        }
    }

    #[test]
    fn principal_point_maps_straight_ahead() {
        let mut f = frame(4, 4, 0.0);
        f.depth[2 * 4 + 2] = 3.0;
        let pts = back_project(&f, 1, false);
        assert_eq!(pts.len(), 1);
        let (p, _) = pts[0];
        assert!((p - DVec3::new(3.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn right_and_down_pixels_map_to_body_axes() {
        let mut f = frame(5, 5, 0.0);
        // cx = cy = 2.5; pixel (4, 0) is right of centre and above it.
        f.depth[4] = 2.0;
        let pts = back_project(&f, 1, false);
        let (p, _) = pts[0];
        assert!(p.y > 0.0, "right of centre must be +y (right)");
        assert!(p.z < 0.0, "above centre must be -z (up)");
        assert!((p.y - 1.5 * 2.0 / 100.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_depths_are_skipped() {
        let mut f = frame(3, 1, 1.0);
        f.depth[0] = f32::NAN;
        f.depth[1] = 25.0;
        f.depth[2] = -1.0;
        assert!(back_project(&f, 1, true).is_empty());
    }

    #[test]
    fn stride_subsamples_both_axes() {
        let f = frame(8, 8, 2.0);
        assert_eq!(back_project(&f, 1, false).len(), 64);
        assert_eq!(back_project(&f, 4, false).len(), 4);
        assert_eq!(back_project(&f, 3, false).len(), 9);
    }

    #[test]
    fn color_mode_uses_rgb() {
        let f = frame(1, 1, 1.0);
        let (_, c) = back_project(&f, 1, true)[0];
        assert!((c[0] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_frame_is_dropped() {
        let mut f = frame(4, 4, 1.0);
        f.rgb.truncate(5);
        assert!(back_project(&f, 1, false).is_empty());
    }
}
