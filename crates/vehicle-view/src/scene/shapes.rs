//! Line and point geometry builders for the scene features.

use super::{Color, Geometry, Primitive};
use glam::DVec3;
use std::f64::consts::TAU;

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
pub const GRID_MINOR: Color = [0.176, 0.969, 1.0, 0.15];
pub const GRID_MAJOR: Color = [0.176, 0.969, 1.0, 0.35];
pub const TRAIL: Color = [1.0, 0.84, 0.2, 0.9];
pub const WAYPOINT: Color = [0.2, 0.9, 0.3, 1.0];
pub const WAYPOINT_SELECTED: Color = [1.0, 0.35, 0.9, 1.0];
pub const WAYPOINT_PATH: Color = [0.2, 0.9, 0.3, 0.6];
pub const DROP_LINE: Color = [0.8, 0.8, 0.8, 0.4];
pub const TARGET: Color = [1.0, 0.25, 0.2, 1.0];

/// Square ground grid centred on the origin, `major_every` lines emphasised.
pub fn grid(half_extent_m: f64, spacing_m: f64, major_every: i64) -> Geometry {
    let mut g = Geometry::new(Primitive::Lines);
    let n = (half_extent_m / spacing_m).floor() as i64;
    let edge = n as f64 * spacing_m;
    for i in -n..=n {
        let c = i as f64 * spacing_m;
        let color = if i % major_every == 0 {
            GRID_MAJOR
        } else {
            GRID_MINOR
        };
        g.push(DVec3::new(c, -edge, 0.0), color);
        g.push(DVec3::new(c, edge, 0.0), color);
        g.push(DVec3::new(-edge, c, 0.0), color);
        g.push(DVec3::new(edge, c, 0.0), color);
    }
    g
}

/// Horizontal circle as line segments.
pub fn ring(g: &mut Geometry, center: DVec3, radius: f64, segments: usize, color: Color) {
    let segments = segments.max(3);
    let at = |i: usize| {
        let (s, c) = (TAU * i as f64 / segments as f64).sin_cos();
        center + DVec3::new(radius * c, radius * s, 0.0)
    };
    for i in 0..segments {
        g.push(at(i), color);
        g.push(at(i + 1), color);
    }
}

/// Flat cross with a ring: the ground target marker.
pub fn target_marker(radius: f64) -> Geometry {
    let mut g = Geometry::new(Primitive::Lines);
    ring(&mut g, DVec3::ZERO, radius, 32, TARGET);
    ring(&mut g, DVec3::ZERO, radius * 0.5, 24, TARGET);
    let r = radius * 1.4;
    for (a, b) in [
        (DVec3::new(-r, 0.0, 0.0), DVec3::new(r, 0.0, 0.0)),
        (DVec3::new(0.0, -r, 0.0), DVec3::new(0.0, r, 0.0)),
    ] {
        g.push(a, TARGET);
        g.push(b, TARGET);
    }
    g
}

/// Hue ramp used to shade points by depth; `t` in 0..=1, near is red.
pub fn depth_color(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    [r, g, b, 1.0]
}
