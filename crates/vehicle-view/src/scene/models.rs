//! Built-in vehicle models, drawn as line sketches in the body FRD frame
//! (x forward, y right, z down, meters).

use super::shapes::ring;
use super::{Color, Geometry, Primitive};
use glam::DVec3;

const BODY: Color = [0.85, 0.9, 1.0, 1.0];
const NOSE: Color = [1.0, 0.3, 0.25, 1.0];

pub struct VehicleModel {
    pub name: &'static str,
    pub geometry: Geometry,
}

/// The selectable model list, addressed by index.
pub struct ModelCatalog {
    models: Vec<VehicleModel>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        Self {
            models: vec![
                VehicleModel {
                    name: "quadrotor",
                    geometry: quadrotor(),
                },
                VehicleModel {
                    name: "fixed-wing",
                    geometry: fixed_wing(),
                },
                VehicleModel {
                    name: "arrow",
                    geometry: arrow(),
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.iter().map(|m| m.name)
    }

    pub fn get(&self, index: usize) -> Option<&VehicleModel> {
        self.models.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.models
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
    }
}

fn segment(g: &mut Geometry, a: DVec3, b: DVec3, color: Color) {
    g.push(a, color);
    g.push(b, color);
}

fn quadrotor() -> Geometry {
    let mut g = Geometry::new(Primitive::Lines);
    let arm = 0.6;
    let d = arm * std::f64::consts::FRAC_1_SQRT_2;
    let rotors = [
        DVec3::new(d, d, 0.0),
        DVec3::new(-d, -d, 0.0),
        DVec3::new(d, -d, 0.0),
        DVec3::new(-d, d, 0.0),
    ];
    segment(&mut g, rotors[0], rotors[1], BODY);
    segment(&mut g, rotors[2], rotors[3], BODY);
    for (i, r) in rotors.iter().enumerate() {
        let color = if r.x > 0.0 { NOSE } else { BODY };
        ring(&mut g, *r + DVec3::new(0.0, 0.0, -0.05), 0.25, 16 + i, color);
    }
    segment(&mut g, DVec3::ZERO, DVec3::new(0.5, 0.0, 0.0), NOSE);
    g
}

fn fixed_wing() -> Geometry {
    let mut g = Geometry::new(Primitive::Lines);
    let nose = DVec3::new(1.0, 0.0, 0.0);
    let tail = DVec3::new(-1.0, 0.0, 0.0);
    segment(&mut g, nose, tail, BODY);
    // Main wing.
    let wl = DVec3::new(0.1, -1.4, 0.0);
    let wr = DVec3::new(0.1, 1.4, 0.0);
    let wtl = DVec3::new(-0.2, -1.4, 0.0);
    let wtr = DVec3::new(-0.2, 1.4, 0.0);
    segment(&mut g, DVec3::new(0.3, 0.0, 0.0), wl, BODY);
    segment(&mut g, DVec3::new(0.3, 0.0, 0.0), wr, BODY);
    segment(&mut g, wl, wtl, BODY);
    segment(&mut g, wr, wtr, BODY);
    segment(&mut g, wtl, DVec3::new(-0.1, 0.0, 0.0), BODY);
    segment(&mut g, wtr, DVec3::new(-0.1, 0.0, 0.0), BODY);
    // Tailplane and fin.
    segment(&mut g, DVec3::new(-0.9, -0.5, 0.0), DVec3::new(-0.9, 0.5, 0.0), BODY);
    segment(&mut g, tail, DVec3::new(-1.0, 0.0, -0.4), BODY);
    segment(&mut g, DVec3::new(-0.7, 0.0, 0.0), DVec3::new(-1.0, 0.0, -0.4), BODY);
    segment(&mut g, nose, nose + DVec3::new(0.3, 0.0, 0.0), NOSE);
    g
}

fn arrow() -> Geometry {
    let mut g = Geometry::new(Primitive::Lines);
    let tip = DVec3::new(1.0, 0.0, 0.0);
    let left = DVec3::new(-0.6, -0.5, 0.0);
    let right = DVec3::new(-0.6, 0.5, 0.0);
    let notch = DVec3::new(-0.3, 0.0, 0.0);
    segment(&mut g, tip, left, NOSE);
    segment(&mut g, left, notch, BODY);
    segment(&mut g, notch, right, BODY);
    segment(&mut g, right, tip, NOSE);
    // Mast pointing up so attitude reads at a glance.
    segment(&mut g, DVec3::ZERO, DVec3::new(0.0, 0.0, -0.4), BODY);
    g
}
