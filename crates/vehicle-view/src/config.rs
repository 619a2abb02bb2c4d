use crate::driver::{ViewSettings, ViewToggles};
use crate::pose::ReferenceFrame;
use crate::scene::imagery::ImageryCatalog;
use crate::scene::models::ModelCatalog;
use crate::trail::TRAIL_CAPACITY;
use clap::Parser;

/// `vehicle-view` - a vehicle-centric 3D situational view.
///
/// Renders a live scene around a (simulated) vehicle: ground grid, flight
/// trail, map imagery, waypoints, a designated target and RGB-D sensor
/// overlays, with a status HUD.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Reference frame for the HUD and for newly created waypoints.
    #[arg(long, value_enum, default_value_t = ReferenceFrame::LocalNed, env = "VIEW_FRAME")]
    pub frame: ReferenceFrame,

    /// Imagery source by name. Unknown names disable imagery.
    #[arg(long, env = "VIEW_MAP_SOURCE")]
    pub map_source: Option<String>,

    /// Vehicle model by name (quadrotor, fixed-wing, arrow).
    #[arg(long, default_value = "quadrotor", env = "VIEW_VEHICLE_MODEL")]
    pub vehicle_model: String,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "VIEW_SHOW_GRID")]
    pub show_grid: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "VIEW_SHOW_TRAIL")]
    pub show_trail: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "VIEW_SHOW_WAYPOINTS")]
    pub show_waypoints: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "VIEW_SHOW_IMAGERY")]
    pub show_imagery: bool,

    /// RGB and depth windows in the HUD.
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set, env = "VIEW_SENSOR_2D")]
    pub sensor_2d: bool,

    /// Back-projected depth cloud in the scene.
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set, env = "VIEW_SENSOR_3D")]
    pub sensor_3d: bool,

    /// Color the depth cloud from the RGB image instead of by depth.
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set, env = "VIEW_SENSOR_COLOR")]
    pub sensor_color: bool,

    #[arg(long, default_value_t = false, action = clap::ArgAction::Set, env = "VIEW_TARGET")]
    pub target: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "VIEW_FOLLOW_CAMERA")]
    pub follow_camera: bool,

    /// Number of trail points kept before the oldest are overwritten.
    #[arg(long, default_value_t = TRAIL_CAPACITY, env = "VIEW_TRAIL_CAPACITY")]
    pub trail_capacity: usize,

    /// Latitude of the simulated vehicle's home, degrees.
    #[arg(long, default_value_t = 47.3977, env = "SIM_ORIGIN_LAT")]
    pub sim_origin_lat: f64,

    /// Longitude of the simulated vehicle's home, degrees.
    #[arg(long, default_value_t = 8.5456, env = "SIM_ORIGIN_LON")]
    pub sim_origin_lon: f64,

    /// Simulate a vehicle without a global position fix.
    #[arg(long, env = "SIM_NO_FIX")]
    pub no_sim_fix: bool,
}

impl Config {
    pub fn toggles(&self) -> ViewToggles {
        ViewToggles {
            grid: self.show_grid,
            trail: self.show_trail,
            waypoints: self.show_waypoints,
            imagery: self.show_imagery,
            sensor_2d: self.sensor_2d,
            sensor_3d: self.sensor_3d,
            sensor_color: self.sensor_color,
            target: self.target,
            follow_camera: self.follow_camera,
        }
    }

    /// Resolves catalog names to indices. Unknown names fall back with a warning.
    pub fn view_settings(
        &self,
        imagery: &ImageryCatalog,
        models: &ModelCatalog,
        viewport: [f32; 2],
    ) -> ViewSettings {
        let map_source = match self.map_source.as_deref() {
            None => (!imagery.is_empty()).then_some(0),
            Some(name) => {
                let found = imagery.position(name);
                if found.is_none() {
                    log::warn!("Unknown map source '{name}'; imagery disabled");
                }
                found
            }
        };
        let vehicle_model = models.position(&self.vehicle_model).unwrap_or_else(|| {
            log::warn!(
                "Unknown vehicle model '{}'; using {}",
                self.vehicle_model,
                models.names().next().unwrap_or("none")
            );
            0
        });
        ViewSettings {
            toggles: self.toggles(),
            frame: self.frame,
            map_source,
            vehicle_model,
            trail_capacity: self.trail_capacity,
            viewport,
        }
    }
}
