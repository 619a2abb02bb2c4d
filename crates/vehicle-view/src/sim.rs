//! Demo collaborators: a simulated vehicle, a synthetic RGB-D camera and
//! procedural imagery.

use crossbeam_channel::{Sender, TrySendError};
use geodesy::{Geodetic, LocalTangentPlane};
use glam::DVec3;
use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};
use vehicle_view::driver::VehicleUpdate;
use vehicle_view::pose::{Attitude, VehicleState};
use vehicle_view::scene::imagery::{ImagerySource, TileImage, TileKey, TILE_PX};
use vehicle_view::scene::sensor::{PinholeIntrinsics, RgbdFrame};

const VEHICLE_RATE_HZ: u64 = 50;
const SENSOR_RATE_HZ: u64 = 10;
const CIRCUIT_RADIUS_M: f64 = 80.0;
const CRUISE_SPEED_M_S: f64 = 8.0;
const CRUISE_ALT_M: f64 = 25.0;
const HOME_ALT_M: f64 = 488.0;

/// Vehicle pose along a circuit at time `t` seconds: a take-off climb
/// followed by a figure-eight.
pub fn circuit_state(t: f64, plane: Option<&LocalTangentPlane>) -> VehicleState {
    let omega = CRUISE_SPEED_M_S / CIRCUIT_RADIUS_M;
    let phase = omega * t;
    let r = CIRCUIT_RADIUS_M;
    let north = r * phase.sin();
    let east = r * phase.sin() * phase.cos();
    let alt = (t * 2.0).min(CRUISE_ALT_M) + 3.0 * (phase * 0.5).sin().max(0.0);

    let dn = r * omega * phase.cos();
    let de = r * omega * (2.0 * phase).cos();
    let yaw = de.atan2(dn);
    let roll = 0.25 * (2.0 * phase).sin();

    let local_ned = DVec3::new(north, east, -alt);
    VehicleState {
        local_ned,
        attitude: Attitude::new(roll, 0.05, yaw),
        geodetic: plane.and_then(|p| p.to_geodetic([east, north, alt]).ok()),
    }
}

/// Publishes the simulated vehicle until the receiver goes away.
pub fn spawn_vehicle(home: Option<Geodetic>, tx: Sender<VehicleUpdate>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let plane = home.and_then(|h| {
            LocalTangentPlane::new(Geodetic::new(h.lat_deg, h.lon_deg, HOME_ALT_M))
                .map_err(|e| log::warn!("Simulated home rejected: {e}"))
                .ok()
        });
        let start = Instant::now();
        let period = Duration::from_millis(1000 / VEHICLE_RATE_HZ);
        log::info!(
            "Simulated vehicle started ({})",
            if plane.is_some() { "with GPS fix" } else { "no GPS fix" }
        );
        loop {
            let state = circuit_state(start.elapsed().as_secs_f64(), plane.as_ref());
            match tx.try_send(VehicleUpdate {
                vehicle_id: 1,
                state,
            }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => log::trace!("Dropped vehicle update (render thread busy)"),
                Err(TrySendError::Disconnected(_)) => break,
            }
            thread::sleep(period);
        }
        log::debug!("Simulated vehicle stopped");
    })
}

/// A forward camera looking at an undulating wall with sky above.
pub fn synthetic_frame(t: f64, width: u32, height: u32) -> RgbdFrame {
    let n = (width * height) as usize;
    let mut rgb = Vec::with_capacity(n * 3);
    let mut depth = Vec::with_capacity(n);
    let horizon = height / 4;
    for v in 0..height {
        for u in 0..width {
            if v < horizon {
                depth.push(0.0);
                rgb.extend_from_slice(&[110, 160, 220]);
                continue;
            }
            let x = u as f64 / width as f64;
            let d = 6.0 + 1.5 * (x * TAU * 2.0 + t).sin() + 0.5 * (v as f64 * 0.05).cos();
            depth.push(d as f32);
            let shade = (255.0 * (1.0 - (d - 4.0) / 5.0)).clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[shade, (u * 255 / width.max(1)) as u8, 90]);
        }
    }
    RgbdFrame {
        width,
        height,
        rgb,
        depth,
        intrinsics: PinholeIntrinsics {
            fx: width as f32 * 0.8,
            fy: width as f32 * 0.8,
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
        },
    }
}

pub fn spawn_sensor(tx: Sender<RgbdFrame>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        let period = Duration::from_millis(1000 / SENSOR_RATE_HZ);
        loop {
            let frame = synthetic_frame(start.elapsed().as_secs_f64(), 160, 120);
            if let Err(TrySendError::Disconnected(_)) = tx.try_send(frame) {
                break;
            }
            thread::sleep(period);
        }
    })
}

/// Procedural tiles: a satellite-like checkerboard or a light street grid.
pub struct CheckerboardSource {
    name: &'static str,
    street: bool,
}

impl CheckerboardSource {
    pub fn satellite() -> Self {
        Self {
            name: "Checkerboard",
            street: false,
        }
    }

    pub fn streets() -> Self {
        Self {
            name: "Streets",
            street: true,
        }
    }
}

impl ImagerySource for CheckerboardSource {
    fn name(&self) -> &str {
        self.name
    }

    fn min_resolution_m(&self) -> f64 {
        0.25
    }

    fn street_map(&self) -> bool {
        self.street
    }

    fn fetch(&self, key: &TileKey) -> Option<TileImage> {
        let px = TILE_PX as usize;
        let cell = px / 8;
        let parity = (key.col + key.row).rem_euclid(2) as usize;
        let mut rgba = Vec::with_capacity(px * px * 4);
        for y in 0..px {
            for x in 0..px {
                let edge = x == 0 || y == 0;
                let c = if self.street {
                    let road = x % (px / 4) < 6 || y % (px / 4) < 6;
                    if road || edge {
                        [255, 255, 255]
                    } else {
                        [232, 228, 218]
                    }
                } else if edge {
                    [30, 40, 30]
                } else if (x / cell + y / cell + parity) % 2 == 0 {
                    [62, 92, 48]
                } else {
                    [88, 112, 64]
                };
                rgba.extend_from_slice(&[c[0], c[1], c[2], 255]);
            }
        }
        Some(TileImage {
            width: TILE_PX,
            height: TILE_PX,
            rgba,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_starts_at_home_and_climbs() {
        let s0 = circuit_state(0.0, None);
        assert!(s0.local_ned.length() < 1e-9);
        let s = circuit_state(30.0, None);
        assert!(s.local_ned.z < -20.0);
        assert!(s.geodetic.is_none());
    }

    #[test]
    fn fix_follows_local_position() {
        let home = Geodetic::new(47.3977, 8.5456, HOME_ALT_M);
        let plane = LocalTangentPlane::new(home).unwrap();
        let s = circuit_state(12.0, Some(&plane));
        let g = s.geodetic.unwrap();
        let enu = plane.to_enu(g).unwrap();
        assert!((enu[0] - s.local_ned.y).abs() < 1e-3);
        assert!((enu[1] - s.local_ned.x).abs() < 1e-3);
        assert!((enu[2] + s.local_ned.z).abs() < 1e-3);
    }

    #[test]
    fn synthetic_frame_is_consistent() {
        let f = synthetic_frame(1.0, 32, 24);
        assert!(f.is_consistent());
        assert_eq!(f.depth[0], 0.0);
        assert!(RgbdFrame::depth_valid(f.depth[f.depth.len() - 1]));
    }

    #[test]
    fn tiles_are_full_size() {
        let src = CheckerboardSource::satellite();
        let key = TileKey {
            source: 0,
            zone: geodesy::UtmZone::containing(47.0, 8.0).unwrap(),
            level: 3,
            col: -2,
            row: 5,
        };
        let img = src.fetch(&key).unwrap();
        assert_eq!(img.rgba.len(), (TILE_PX * TILE_PX * 4) as usize);
        assert!(CheckerboardSource::streets().street_map());
    }
}
