//! Universal Transverse Mercator projection (Snyder's series, WGS-84).

use crate::{wgs84, GeoError};
use std::fmt;
use std::str::FromStr;

/// Scale factor on the central meridian.
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude bands from 80S in 8 degree steps; X is stretched to 84N.
const BANDS: &[u8; 20] = b"CDEFGHJKLMNPQRSTUVWX";

/// A UTM grid zone: longitude zone number (1..=60) plus latitude band letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    number: u8,
    band: char,
}

impl UtmZone {
    pub fn new(number: u8, band: char) -> Result<Self, GeoError> {
        let band = band.to_ascii_uppercase();
        if !(1..=60).contains(&number) || !BANDS.contains(&(band as u8)) {
            return Err(GeoError::InvalidZone(format!("{number}{band}")));
        }
        Ok(Self { number, band })
    }

    /// Zone containing the given position, including the Norway/Svalbard exceptions.
    pub fn containing(lat_deg: f64, lon_deg: f64) -> Result<Self, GeoError> {
        if !(-80.0..=84.0).contains(&lat_deg) || !lat_deg.is_finite() {
            return Err(GeoError::OutsideUtm(lat_deg));
        }
        let lon = normalize_lon(lon_deg);

        let mut number = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;

        if (56.0..64.0).contains(&lat_deg) && (3.0..12.0).contains(&lon) {
            number = 32;
        }
        if (72.0..=84.0).contains(&lat_deg) {
            number = match lon {
                l if (0.0..9.0).contains(&l) => 31,
                l if (9.0..21.0).contains(&l) => 33,
                l if (21.0..33.0).contains(&l) => 35,
                l if (33.0..42.0).contains(&l) => 37,
                _ => number,
            };
        }

        let band_idx = (((lat_deg + 80.0) / 8.0).floor() as usize).min(BANDS.len() - 1);
        Ok(Self {
            number,
            band: BANDS[band_idx] as char,
        })
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn band(&self) -> char {
        self.band
    }

    pub fn is_northern(&self) -> bool {
        self.band >= 'N'
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.band)
    }
}

impl FromStr for UtmZone {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || GeoError::InvalidZone(s.to_string());

        let band = s.chars().last().ok_or_else(invalid)?;
        let digits = &s[..s.len() - band.len_utf8()];
        let number: u8 = digits.parse().map_err(|_| invalid())?;

        Self::new(number, band).map_err(|_| invalid())
    }
}

/// A projected position inside a specific zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmCoord {
    pub zone: UtmZone,
    pub easting: f64,
    pub northing: f64,
}

/// Longitude of the central meridian of a zone, degrees.
#[inline]
pub fn central_meridian_deg(zone_number: u8) -> f64 {
    -183.0 + 6.0 * zone_number as f64
}

/// Projects into the zone that contains the position.
pub fn geodetic_to_utm(lat_deg: f64, lon_deg: f64) -> Result<UtmCoord, GeoError> {
    let zone = UtmZone::containing(lat_deg, lon_deg)?;
    geodetic_to_utm_in_zone(lat_deg, lon_deg, zone)
}

/// Projects into a caller-chosen zone. Used to keep everything in one grid
/// when a vehicle wanders across a zone boundary.
pub fn geodetic_to_utm_in_zone(
    lat_deg: f64,
    lon_deg: f64,
    zone: UtmZone,
) -> Result<UtmCoord, GeoError> {
    if !(-80.0..=84.0).contains(&lat_deg) || !lat_deg.is_finite() {
        return Err(GeoError::OutsideUtm(lat_deg));
    }

    let e2 = wgs84::E2;
    let ep2 = e2 / (1.0 - e2);

    let phi = lat_deg.to_radians();
    let lam = normalize_lon(lon_deg).to_radians();
    let lam0 = central_meridian_deg(zone.number).to_radians();
    let dlam = normalize_lon((lam - lam0).to_degrees()).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = wgs84::A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * dlam;
    let m = meridian_arc(phi);

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + FALSE_EASTING;

    let mut northing = K0
        * (m + n
            * tan_phi
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    if !zone.is_northern() {
        northing += FALSE_NORTHING_SOUTH;
    }

    Ok(UtmCoord {
        zone,
        easting,
        northing,
    })
}

/// Inverse projection; returns (lat_deg, lon_deg).
pub fn utm_to_geodetic(coord: &UtmCoord) -> (f64, f64) {
    let e2 = wgs84::E2;
    let ep2 = e2 / (1.0 - e2);
    let (e4, e6) = (e2 * e2, e2 * e2 * e2);

    let x = coord.easting - FALSE_EASTING;
    let y = if coord.zone.is_northern() {
        coord.northing
    } else {
        coord.northing - FALSE_NORTHING_SOUTH
    };

    // Footpoint latitude.
    let m = y / K0;
    let mu = m / (wgs84::A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = phi1.tan();
    let n1 = wgs84::A / (1.0 - e2 * sin1 * sin1).sqrt();
    let t1 = tan1 * tan1;
    let c1 = ep2 * cos1 * cos1;
    let r1 = wgs84::A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos1;

    (
        lat.to_degrees(),
        normalize_lon(central_meridian_deg(coord.zone.number) + lon.to_degrees()),
    )
}

/// Length of the meridian arc from the equator to `phi` (radians).
fn meridian_arc(phi: f64) -> f64 {
    let e2 = wgs84::E2;
    let (e4, e6) = (e2 * e2, e2 * e2 * e2);
    wgs84::A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Wraps a longitude into [-180, 180).
#[inline]
fn normalize_lon(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_reference_point() {
        let utm = geodetic_to_utm(51.2, 7.5).unwrap();
        assert_eq!(utm.zone.to_string(), "32U");
        assert!((utm.easting - 395_201.310).abs() < 0.01);
        assert!((utm.northing - 5_673_135.241).abs() < 0.01);
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let utm = geodetic_to_utm(0.0, 9.0).unwrap();
        assert!((utm.easting - 500_000.0).abs() < 1e-6);
        assert!(utm.northing.abs() < 1e-6);
    }

    #[test]
    fn southern_hemisphere_uses_false_northing() {
        let utm = geodetic_to_utm(-10.0, 9.0).unwrap();
        assert_eq!(utm.zone.band(), 'L');
        assert!(!utm.zone.is_northern());
        assert!((utm.northing - 8_894_587.509).abs() < 0.01);
    }

    #[test]
    fn inverse_recovers_position() {
        let utm = geodetic_to_utm(47.3769, 8.5417).unwrap();
        let (lat, lon) = utm_to_geodetic(&utm);
        assert!((lat - 47.3769).abs() < 1e-7);
        assert!((lon - 8.5417).abs() < 1e-7);
    }

    #[test]
    fn zone_exceptions() {
        assert_eq!(UtmZone::containing(60.0, 5.0).unwrap().to_string(), "32V");
        assert_eq!(UtmZone::containing(78.0, 10.0).unwrap().to_string(), "33X");
        assert_eq!(UtmZone::containing(47.0, -122.0).unwrap().to_string(), "10T");
    }

    #[test]
    fn rejects_polar_latitudes() {
        assert_eq!(geodetic_to_utm(85.0, 0.0), Err(GeoError::OutsideUtm(85.0)));
        assert!(geodetic_to_utm(-81.0, 0.0).is_err());
    }

    #[test]
    fn zone_parsing() {
        let zone: UtmZone = "32u".parse().unwrap();
        assert_eq!(zone.number(), 32);
        assert_eq!(zone.band(), 'U');
        assert!(zone.is_northern());

        assert!("61U".parse::<UtmZone>().is_err());
        assert!("32I".parse::<UtmZone>().is_err());
        assert!("U".parse::<UtmZone>().is_err());
        assert!("".parse::<UtmZone>().is_err());
    }

    #[test]
    fn forced_zone_stays_continuous_across_boundary() {
        // 12.01E belongs to zone 33 but can be expressed in 32.
        let zone32 = UtmZone::new(32, 'U').unwrap();
        let west = geodetic_to_utm_in_zone(50.0, 11.99, zone32).unwrap();
        let east = geodetic_to_utm_in_zone(50.0, 12.01, zone32).unwrap();
        let dx = east.easting - west.easting;
        // 0.02 deg of longitude at 50N is roughly 1.43 km.
        assert!(dx > 1_400.0 && dx < 1_460.0, "dx = {dx}");
    }
}
