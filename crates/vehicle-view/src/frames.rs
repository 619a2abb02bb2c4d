//! Conversions between the vehicle body frame, the local NED frame, the
//! ENU render space and the global UTM/geodetic frame.
//!
//! Render space is local ENU meters: `(east, north, up) = (y, x, -z)` of NED.
//! The global frame becomes available once a telemetry snapshot carries a
//! geodetic fix; from then on the UTM coordinates of the local origin are
//! fixed until [`CoordinateTransformer::reset`].

use crate::pose::{ReferenceFrame, VehiclePose, VehicleState};
use crate::waypoint::Waypoint;
use geodesy::{
    geodetic_to_utm_in_zone, utm_to_geodetic, Geodetic, LocalTangentPlane, UtmCoord, UtmZone,
};
use glam::{DMat3, DMat4, DVec3};
use sguaba::{engineering::Orientation, system, Coordinate};
use thiserror::Error;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};

system!(struct VehicleNed using NED);
system!(struct VehicleFrd using FRD);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("global frame unavailable: no UTM zone established")]
    Unavailable,
    #[error("position lies outside the UTM projection")]
    OutsideProjection,
    #[error("not a valid geodetic position")]
    InvalidPosition,
}

/// Anchor of the local NED frame on the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georeference {
    pub zone: UtmZone,
    pub plane: LocalTangentPlane,
}

/// A pose re-expressed in global terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPose {
    pub utm: UtmCoord,
    pub geodetic: Geodetic,
}

/// Placement of the vehicle in render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPose {
    /// ENU position, meters.
    pub position: DVec3,
    /// Heading measured clockwise from north, radians.
    pub heading: f64,
    /// Maps body FRD model coordinates into render space.
    pub model: DMat4,
}

/// Axis swap from NED to ENU. Its own inverse.
const NED_TO_ENU: DMat3 = DMat3::from_cols(
    DVec3::new(0.0, 1.0, 0.0),
    DVec3::new(1.0, 0.0, 0.0),
    DVec3::new(0.0, 0.0, -1.0),
);

#[derive(Debug, Clone, Default)]
pub struct CoordinateTransformer {
    frame: ReferenceFrame,
    georef: Option<Georeference>,
}

impl CoordinateTransformer {
    pub fn new(frame: ReferenceFrame) -> Self {
        Self {
            frame,
            georef: None,
        }
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.frame
    }

    pub fn set_frame(&mut self, frame: ReferenceFrame) {
        self.frame = frame;
    }

    pub fn georeference(&self) -> Option<&Georeference> {
        self.georef.as_ref()
    }

    pub fn is_global_available(&self) -> bool {
        self.georef.is_some()
    }

    /// Forgets the georeference, e.g. when the active vehicle changes.
    pub fn reset(&mut self) {
        self.georef = None;
    }

    /// Builds the pose snapshot for one telemetry update.
    pub fn ingest(&mut self, state: &VehicleState) -> VehiclePose {
        if self.georef.is_none() {
            if let Some(fix) = state.geodetic {
                match establish_georeference(fix, state.local_ned) {
                    Ok(georef) => {
                        log::info!(
                            "Georeference established: zone {}, origin ({:.7}, {:.7})",
                            georef.zone,
                            georef.plane.origin().lat_deg,
                            georef.plane.origin().lon_deg
                        );
                        self.georef = Some(georef);
                    }
                    Err(e) => log::debug!("Geodetic fix not usable: {e}"),
                }
            }
        }

        VehiclePose {
            position: state.local_ned,
            attitude: state.attitude,
            utm_zone: self.georef.map(|g| g.zone),
            frame: self.frame,
        }
    }

    #[inline]
    pub fn local_to_render(ned: DVec3) -> DVec3 {
        NED_TO_ENU * ned
    }

    #[inline]
    pub fn render_to_local(enu: DVec3) -> DVec3 {
        NED_TO_ENU * enu
    }

    pub fn render_pose(&self, pose: &VehiclePose) -> RenderPose {
        let body_to_ned =
            DMat4::from_rotation_translation(pose.attitude.to_quat(), pose.position);
        RenderPose {
            position: Self::local_to_render(pose.position),
            heading: pose.attitude.yaw,
            model: DMat4::from_mat3(NED_TO_ENU) * body_to_ned,
        }
    }

    /// Body FRD point (relative to the vehicle) into local NED.
    pub fn body_to_local(&self, pose: &VehiclePose, body: DVec3) -> DVec3 {
        let orientation = Orientation::<VehicleNed>::tait_bryan_builder()
            .yaw(Angle::new::<radian>(pose.attitude.yaw))
            .pitch(Angle::new::<radian>(pose.attitude.pitch))
            .roll(Angle::new::<radian>(pose.attitude.roll))
            .build();
        // SAFETY: the attitude is the orientation of the body axes in NED.
        let frd_to_ned = unsafe { orientation.map_as_zero_in::<VehicleFrd>() }.inverse();
        let point = frd_to_ned.transform(
            Coordinate::<VehicleFrd>::builder()
                .frd_front(Length::new::<meter>(body.x))
                .frd_right(Length::new::<meter>(body.y))
                .frd_down(Length::new::<meter>(body.z))
                .build(),
        );
        DVec3::new(
            point.ned_north().get::<meter>(),
            point.ned_east().get::<meter>(),
            point.ned_down().get::<meter>(),
        ) + pose.position
    }

    pub fn local_to_geodetic(&self, ned: DVec3) -> Result<Geodetic, FrameError> {
        let georef = self.georef.as_ref().ok_or(FrameError::Unavailable)?;
        let enu = Self::local_to_render(ned);
        georef
            .plane
            .to_geodetic(enu.to_array())
            .map_err(|_| FrameError::InvalidPosition)
    }

    pub fn geodetic_to_local(&self, position: Geodetic) -> Result<DVec3, FrameError> {
        let georef = self.georef.as_ref().ok_or(FrameError::Unavailable)?;
        let enu = georef
            .plane
            .to_enu(position)
            .map_err(|_| FrameError::InvalidPosition)?;
        let enu = DVec3::from_array(enu);
        Ok(Self::render_to_local(enu))
    }

    pub fn local_to_utm(&self, ned: DVec3) -> Result<UtmCoord, FrameError> {
        let georef = self.georef.as_ref().ok_or(FrameError::Unavailable)?;
        let geo = self.local_to_geodetic(ned)?;
        geodetic_to_utm_in_zone(geo.lat_deg, geo.lon_deg, georef.zone)
            .map_err(|_| FrameError::OutsideProjection)
    }

    /// UTM coordinate at an absolute altitude to local NED.
    pub fn utm_to_local(&self, utm: &UtmCoord, alt_m: f64) -> Result<DVec3, FrameError> {
        if self.georef.is_none() {
            return Err(FrameError::Unavailable);
        }
        let (lat_deg, lon_deg) = utm_to_geodetic(utm);
        self.geodetic_to_local(Geodetic::new(lat_deg, lon_deg, alt_m))
    }

    /// UTM ground point (in the georeference zone) to local NED on the
    /// ground plane (z = 0).
    pub fn utm_to_ground(&self, easting: f64, northing: f64) -> Result<DVec3, FrameError> {
        let georef = self.georef.as_ref().ok_or(FrameError::Unavailable)?;
        let utm = UtmCoord {
            zone: georef.zone,
            easting,
            northing,
        };
        let ned = self.utm_to_local(&utm, georef.plane.origin().alt_m)?;
        Ok(DVec3::new(ned.x, ned.y, 0.0))
    }

    pub fn global_pose(&self, pose: &VehiclePose) -> Result<GlobalPose, FrameError> {
        Ok(GlobalPose {
            utm: self.local_to_utm(pose.position)?,
            geodetic: self.local_to_geodetic(pose.position)?,
        })
    }

    /// Waypoint coordinates (in the waypoint's own frame) to local NED.
    pub fn waypoint_to_local(&self, wp: &Waypoint) -> Result<DVec3, FrameError> {
        match wp.frame {
            ReferenceFrame::LocalNed => Ok(wp.position),
            ReferenceFrame::Global => self.geodetic_to_local(Geodetic::new(
                wp.position.x,
                wp.position.y,
                wp.position.z,
            )),
        }
    }

    /// Local NED to waypoint coordinates in `frame`: NED meters for
    /// `LocalNed`, `(lat_deg, lon_deg, alt_m)` for `Global`.
    pub fn local_to_waypoint(
        &self,
        ned: DVec3,
        frame: ReferenceFrame,
    ) -> Result<DVec3, FrameError> {
        match frame {
            ReferenceFrame::LocalNed => Ok(ned),
            ReferenceFrame::Global => {
                let geo = self.local_to_geodetic(ned)?;
                Ok(DVec3::new(geo.lat_deg, geo.lon_deg, geo.alt_m))
            }
        }
    }
}

/// Derives the geodetic origin of the local frame from one fix: the vehicle
/// sits at `local_ned` from the origin, so step back by that offset in the
/// vehicle's own tangent plane.
fn establish_georeference(
    fix: Geodetic,
    local_ned: DVec3,
) -> Result<Georeference, geodesy::GeoError> {
    let at_vehicle = LocalTangentPlane::new(fix)?;
    let back = -CoordinateTransformer::local_to_render(local_ned);
    let origin = at_vehicle.to_geodetic(back.to_array())?;
    let zone = UtmZone::containing(origin.lat_deg, origin.lon_deg)?;
    Ok(Georeference {
        zone,
        plane: LocalTangentPlane::new(origin)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Attitude;
    use crate::waypoint::WaypointId;
    use std::f64::consts::FRAC_PI_2;

    fn state(local: DVec3, fix: Option<Geodetic>) -> VehicleState {
        VehicleState {
            local_ned: local,
            attitude: Attitude::default(),
            geodetic: fix,
        }
    }

    #[test]
    fn ned_and_enu_swap() {
        let ned = DVec3::new(10.0, 5.0, -3.0);
        let enu = CoordinateTransformer::local_to_render(ned);
        assert_eq!(enu, DVec3::new(5.0, 10.0, 3.0));
        assert_eq!(CoordinateTransformer::render_to_local(enu), ned);
    }

    #[test]
    fn global_queries_fail_without_fix() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::Global);
        let pose = tf.ingest(&state(DVec3::new(1.0, 2.0, -3.0), None));
        assert_eq!(pose.utm_zone, None);
        assert_eq!(tf.global_pose(&pose), Err(FrameError::Unavailable));
        assert_eq!(tf.utm_to_ground(0.0, 0.0), Err(FrameError::Unavailable));
        assert_eq!(
            tf.local_to_waypoint(DVec3::ZERO, ReferenceFrame::Global),
            Err(FrameError::Unavailable)
        );
        // Local work keeps functioning.
        assert_eq!(
            tf.local_to_waypoint(DVec3::ONE, ReferenceFrame::LocalNed),
            Ok(DVec3::ONE)
        );
    }

    #[test]
    fn first_fix_establishes_origin() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::LocalNed);
        let fix = Geodetic::new(47.3977, 8.5456, 500.0);
        let local = DVec3::new(100.0, -50.0, -20.0);
        let pose = tf.ingest(&state(local, Some(fix)));

        assert_eq!(pose.utm_zone.map(|z| z.to_string()), Some("32T".to_string()));

        // The vehicle's own position maps back onto its fix.
        let geo = tf.local_to_geodetic(local).unwrap();
        assert!((geo.lat_deg - fix.lat_deg).abs() < 1e-7);
        assert!((geo.lon_deg - fix.lon_deg).abs() < 1e-7);
        assert!((geo.alt_m - fix.alt_m).abs() < 0.05);

        // A later fix does not move the origin.
        let before = *tf.georeference().unwrap();
        tf.ingest(&state(local, Some(Geodetic::new(47.4, 8.55, 480.0))));
        assert_eq!(*tf.georeference().unwrap(), before);
    }

    #[test]
    fn utm_ground_round_trip() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::Global);
        tf.ingest(&state(DVec3::ZERO, Some(Geodetic::new(51.2, 7.5, 100.0))));

        let ned = DVec3::new(250.0, -125.0, 0.0);
        let utm = tf.local_to_utm(ned).unwrap();
        let back = tf.utm_to_ground(utm.easting, utm.northing).unwrap();
        assert!((back - ned).length() < 0.01, "{back:?}");

        let up = tf.utm_to_local(&utm, 140.0).unwrap();
        assert!((up.z + 40.0).abs() < 0.05, "{up:?}");
    }

    #[test]
    fn global_waypoint_round_trip() {
        let mut tf = CoordinateTransformer::new(ReferenceFrame::Global);
        tf.ingest(&state(DVec3::ZERO, Some(Geodetic::new(-33.86, 151.21, 30.0))));

        let ned = DVec3::new(-40.0, 75.0, -12.0);
        let coords = tf.local_to_waypoint(ned, ReferenceFrame::Global).unwrap();
        let wp = Waypoint {
            id: WaypointId(0),
            position: coords,
            frame: ReferenceFrame::Global,
        };
        let back = tf.waypoint_to_local(&wp).unwrap();
        assert!((back - ned).length() < 1e-3);
    }

    #[test]
    fn body_offsets_follow_heading() {
        let tf = CoordinateTransformer::new(ReferenceFrame::LocalNed);
        let pose = VehiclePose {
            position: DVec3::new(10.0, 0.0, -5.0),
            attitude: Attitude::new(0.0, 0.0, FRAC_PI_2),
            utm_zone: None,
            frame: ReferenceFrame::LocalNed,
        };
        // One meter ahead of a vehicle facing east.
        let p = tf.body_to_local(&pose, DVec3::X);
        assert!((p - DVec3::new(10.0, 1.0, -5.0)).length() < 1e-9, "{p:?}");

        let render = tf.render_pose(&pose);
        let nose = render.model.transform_point3(DVec3::X);
        assert!((nose - DVec3::new(1.0, 10.0, 5.0)).length() < 1e-12);
    }

    #[test]
    fn body_points_agree_with_model_transform() {
        let tf = CoordinateTransformer::new(ReferenceFrame::LocalNed);
        let pose = VehiclePose {
            position: DVec3::new(-3.0, 7.0, -12.0),
            attitude: Attitude::new(0.2, -0.35, 2.1),
            utm_zone: None,
            frame: ReferenceFrame::LocalNed,
        };
        let body = DVec3::new(1.5, -0.5, 2.0);
        let via_cloud = tf.body_to_local(&pose, body);
        let via_model = pose.attitude.to_quat() * body + pose.position;
        assert!((via_cloud - via_model).length() < 1e-9, "{via_cloud:?} vs {via_model:?}");
    }
}
