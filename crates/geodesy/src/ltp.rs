//! East-North-Up tangent plane anchored at a geodetic origin.

use crate::{GeoError, Geodetic};
use sguaba::{math::RigidBodyTransform, system, systems::Ecef, systems::Wgs84, Coordinate};
use uom::si::f64::{Angle, Length};
use uom::si::{angle::degree, length::meter};

system!(struct PlaneEnu using ENU);

impl Geodetic {
    pub fn to_wgs84(&self) -> Result<Wgs84, GeoError> {
        Ok(Wgs84::builder()
            .latitude(Angle::new::<degree>(self.lat_deg))
            .ok_or_else(|| GeoError::InvalidLatitude(self.lat_deg))?
            .longitude(Angle::new::<degree>(self.lon_deg))
            .altitude(Length::new::<meter>(self.alt_m))
            .build())
    }

    pub fn from_wgs84(wgs84: &Wgs84) -> Self {
        Self {
            lat_deg: wgs84.latitude().get::<degree>(),
            lon_deg: wgs84.longitude().get::<degree>(),
            alt_m: wgs84.altitude().get::<meter>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTangentPlane {
    origin: Geodetic,
}

impl LocalTangentPlane {
    pub fn new(origin: Geodetic) -> Result<Self, GeoError> {
        origin.to_wgs84()?;
        Ok(Self { origin })
    }

    pub fn origin(&self) -> Geodetic {
        self.origin
    }

    fn ecef_to_enu(&self) -> Result<RigidBodyTransform<Ecef, PlaneEnu>, GeoError> {
        let origin = self.origin.to_wgs84()?;
        // SAFETY: `origin` is the origin of `PlaneEnu`.
        Ok(unsafe { RigidBodyTransform::ecef_to_enu_at(&origin) })
    }

    /// ENU offset (meters) of a geodetic position relative to the origin.
    pub fn to_enu(&self, position: Geodetic) -> Result<[f64; 3], GeoError> {
        let ecef = Coordinate::<Ecef>::from_wgs84(&position.to_wgs84()?);
        let enu = self.ecef_to_enu()?.transform(ecef);
        Ok([
            enu.enu_east().get::<meter>(),
            enu.enu_north().get::<meter>(),
            enu.enu_up().get::<meter>(),
        ])
    }

    /// Geodetic position of an ENU offset from the origin.
    pub fn to_geodetic(&self, enu: [f64; 3]) -> Result<Geodetic, GeoError> {
        let local = Coordinate::<PlaneEnu>::builder()
            .enu_east(Length::new::<meter>(enu[0]))
            .enu_north(Length::new::<meter>(enu[1]))
            .enu_up(Length::new::<meter>(enu[2]))
            .build();
        let ecef = self.ecef_to_enu()?.inverse_transform(local);
        Ok(Geodetic::from_wgs84(&ecef.to_wgs84()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_zero() {
        let origin = Geodetic::new(47.3977, 8.5456, 488.0);
        let ltp = LocalTangentPlane::new(origin).unwrap();
        let enu = ltp.to_enu(origin).unwrap();
        assert!(enu.iter().all(|c| c.abs() < 1e-6), "{enu:?}");
    }

    #[test]
    fn north_offset_increases_latitude() {
        let ltp = LocalTangentPlane::new(Geodetic::new(47.0, 8.0, 0.0)).unwrap();
        let p = ltp.to_geodetic([0.0, 1000.0, 0.0]).unwrap();
        assert!(p.lat_deg > 47.0);
        assert!((p.lon_deg - 8.0).abs() < 1e-9);
        // One kilometre north is roughly 0.009 degrees.
        assert!((p.lat_deg - 47.0 - 0.008_99).abs() < 1e-4);
    }

    #[test]
    fn enu_round_trip() {
        let ltp = LocalTangentPlane::new(Geodetic::new(-33.86, 151.21, 20.0)).unwrap();
        let enu = [120.5, -340.25, 15.0];
        let back = ltp.to_enu(ltp.to_geodetic(enu).unwrap()).unwrap();
        for (a, b) in enu.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn up_offset_is_height() {
        let ltp = LocalTangentPlane::new(Geodetic::new(12.0, 30.0, 1000.0)).unwrap();
        let p = ltp.to_geodetic([0.0, 0.0, 250.0]).unwrap();
        assert!((p.alt_m - 1250.0).abs() < 1e-3);
        assert!((p.lat_deg - 12.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_impossible_origin() {
        assert_eq!(
            LocalTangentPlane::new(Geodetic::new(95.0, 0.0, 0.0)),
            Err(GeoError::InvalidLatitude(95.0))
        );
    }
}
