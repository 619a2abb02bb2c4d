//! geodesy: small WGS-84 toolbox for vehicle-centric views.
//!
//! - Local tangent planes (ENU) anchored at a geodetic origin, on top of
//!   `sguaba`'s ECEF transforms.
//! - UTM projection with zone/latitude-band bookkeeping ("32U").
//!
//! Angles at this API are degrees, lengths are meters, everything is `f64`.
//! Inside the projection maths angles are radians.

mod ltp;
mod utm;

pub use ltp::LocalTangentPlane;
pub use utm::{
    central_meridian_deg, geodetic_to_utm, geodetic_to_utm_in_zone, utm_to_geodetic, UtmCoord,
    UtmZone,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0:.6} deg is outside the UTM band (80S..84N)")]
    OutsideUtm(f64),
    #[error("invalid UTM zone '{0}'")]
    InvalidZone(String),
    #[error("latitude {0:.6} deg is outside [-90, 90]")]
    InvalidLatitude(f64),
}

pub mod wgs84 {
    /// Semi-major axis (equatorial radius) in meters.
    pub const A: f64 = 6_378_137.0;

    /// Flattening factor (1 / 298.257223563).
    pub const F: f64 = 1.0 / 298.257_223_563;

    /// First eccentricity squared.
    pub const E2: f64 = F * (2.0 - F);
}

/// A geodetic position on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Height above the ellipsoid, meters.
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }
}
