//! Screen-ray picking against waypoint markers, the target marker and the
//! horizontal work plane. All coordinates are render space (ENU).

use glam::DVec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit length.
    pub dir: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, dir: DVec3) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.dir * t
    }

    /// Nearest non-negative hit distance with a sphere.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.dir);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        [-b - sq, -b + sq].into_iter().find(|t| *t >= 0.0)
    }

    /// Hit distance with the horizontal plane `up = height`.
    pub fn intersect_horizontal(&self, height: f64) -> Option<f64> {
        if self.dir.z.abs() < 1e-9 {
            return None;
        }
        let t = (height - self.origin.z) / self.dir.z;
        (t >= 0.0).then_some(t)
    }
}

/// Something a pick can land on besides the work plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickable {
    Waypoint(usize),
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickHit {
    Marker { what: Pickable, point: DVec3 },
    Plane { point: DVec3 },
}

/// Marker pick radius in meters, growing with camera distance so markers
/// stay clickable when zoomed out.
pub fn marker_radius(camera_distance_m: f64) -> f64 {
    (camera_distance_m * 0.02).max(0.5)
}

/// Nearest marker along the ray; the work plane only when no marker is hit.
pub fn pick(
    ray: &Ray,
    markers: &[(Pickable, DVec3)],
    radius: f64,
    plane_height: Option<f64>,
) -> Option<PickHit> {
    let nearest = markers
        .iter()
        .filter_map(|(what, center)| ray.intersect_sphere(*center, radius).map(|t| (t, *what)))
        .min_by(|a, b| a.0.total_cmp(&b.0));

    if let Some((t, what)) = nearest {
        return Some(PickHit::Marker {
            what,
            point: ray.at(t),
        });
    }

    plane_height
        .and_then(|h| ray.intersect_horizontal(h))
        .map(|t| PickHit::Plane {
            point: ray.at(t),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_from(x: f64, y: f64) -> Ray {
        Ray::new(DVec3::new(x, y, 100.0), DVec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn sphere_front_hit() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let t = ray.intersect_sphere(DVec3::new(10.0, 0.0, 0.0), 1.0).unwrap();
        assert!((t - 9.0).abs() < 1e-12);
        assert!(ray.intersect_sphere(DVec3::new(-10.0, 0.0, 0.0), 1.0).is_none());
        assert!(ray.intersect_sphere(DVec3::new(10.0, 5.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn plane_hit_and_parallel_miss() {
        let ray = down_from(3.0, 4.0);
        let t = ray.intersect_horizontal(20.0).unwrap();
        assert_eq!(ray.at(t), DVec3::new(3.0, 4.0, 20.0));
        let flat = Ray::new(DVec3::ZERO, DVec3::X);
        assert!(flat.intersect_horizontal(5.0).is_none());
        // Plane behind the origin.
        assert!(down_from(0.0, 0.0).intersect_horizontal(150.0).is_none());
    }

    #[test]
    fn nearest_marker_wins() {
        let ray = down_from(0.0, 0.0);
        let markers = [
            (Pickable::Waypoint(0), DVec3::new(0.0, 0.0, 10.0)),
            (Pickable::Waypoint(1), DVec3::new(0.0, 0.0, 50.0)),
            (Pickable::Target, DVec3::new(0.0, 0.0, 0.0)),
        ];
        let hit = pick(&ray, &markers, 1.0, Some(30.0));
        assert!(matches!(
            hit,
            Some(PickHit::Marker {
                what: Pickable::Waypoint(1),
                ..
            })
        ));
    }

    #[test]
    fn plane_is_fallback() {
        let ray = down_from(7.0, -2.0);
        let markers = [(Pickable::Waypoint(0), DVec3::new(50.0, 50.0, 10.0))];
        match pick(&ray, &markers, 1.0, Some(12.0)) {
            Some(PickHit::Plane { point }) => {
                assert!((point - DVec3::new(7.0, -2.0, 12.0)).length() < 1e-9)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(pick(&ray, &markers, 1.0, None).is_none());
    }

    #[test]
    fn radius_grows_with_distance() {
        assert_eq!(marker_radius(1.0), 0.5);
        assert!(marker_radius(1000.0) > marker_radius(100.0));
    }
}
