//! Vehicle pose snapshots as delivered by telemetry and consumed by the view.

use geodesy::{Geodetic, UtmZone};
use glam::{DQuat, DVec3, EulerRot};

/// Coordinate frame used for presentation and for newly created waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReferenceFrame {
    /// Local North-East-Down meters relative to the vehicle's home.
    #[default]
    LocalNed,
    /// WGS-84 latitude/longitude/altitude, displayed through UTM.
    Global,
}

impl ReferenceFrame {
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceFrame::LocalNed => "Local (NED)",
            ReferenceFrame::Global => "Global",
        }
    }
}

/// Tait-Bryan attitude of the body FRD frame relative to NED, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Attitude {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Rotation taking body FRD vectors into NED.
    pub fn to_quat(&self) -> DQuat {
        DQuat::from_euler(EulerRot::ZYX, self.yaw, self.pitch, self.roll)
    }

    pub fn to_degrees(&self) -> [f64; 3] {
        [
            self.roll.to_degrees(),
            self.pitch.to_degrees(),
            self.yaw.to_degrees(),
        ]
    }
}

/// Raw snapshot handed over by the vehicle-state collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// Position in the local NED frame, meters.
    pub local_ned: DVec3,
    pub attitude: Attitude,
    /// Present once the vehicle has a global position fix.
    pub geodetic: Option<Geodetic>,
}

/// Read-only pose for one telemetry update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePose {
    /// Local NED position, meters.
    pub position: DVec3,
    pub attitude: Attitude,
    /// `None` until a georeference has been established.
    pub utm_zone: Option<UtmZone>,
    pub frame: ReferenceFrame,
}

impl VehiclePose {
    /// Altitude above the local origin, meters (up positive).
    pub fn altitude(&self) -> f64 {
        -self.position.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn yaw_rotates_forward_to_east() {
        let q = Attitude::new(0.0, 0.0, FRAC_PI_2).to_quat();
        let forward_ned = q * DVec3::X;
        assert!((forward_ned - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn roll_rotates_right_wing_down() {
        let q = Attitude::new(FRAC_PI_2, 0.0, 0.0).to_quat();
        let right_ned = q * DVec3::Y;
        assert!((right_ned - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn altitude_is_negated_down() {
        let pose = VehiclePose {
            position: DVec3::new(1.0, 2.0, -15.0),
            attitude: Attitude::default(),
            utm_zone: None,
            frame: ReferenceFrame::LocalNed,
        };
        assert_eq!(pose.altitude(), 15.0);
    }
}
