use crossbeam_channel::{bounded, Sender};
use geodesy::{Geodetic, LocalTangentPlane};
use glam::DVec3;
use vehicle_view::driver::{
    ChannelVehicleSource, Collaborators, RenderLoopDriver, Toggle, VehicleUpdate, ViewSettings,
    ViewToggles,
};
use vehicle_view::interaction::{Menu, MenuAction, PointerInput, Reaction};
use vehicle_view::picking::Ray;
use vehicle_view::pose::{Attitude, ReferenceFrame, VehicleState};
use vehicle_view::scene::imagery::{ImageryCatalog, ImagerySource, TileImage, TileKey};
use vehicle_view::scene::models::ModelCatalog;
use vehicle_view::scene::FeatureKey;
use vehicle_view::waypoint::WaypointList;

const HOME: (f64, f64, f64) = (47.3977, 8.5456, 488.0);

struct Solid;

impl ImagerySource for Solid {
    fn name(&self) -> &str {
        "solid"
    }

    fn min_resolution_m(&self) -> f64 {
        1.0
    }

    fn fetch(&self, _key: &TileKey) -> Option<TileImage> {
        Some(TileImage {
            width: 2,
            height: 2,
            rgba: vec![128; 16],
        })
    }
}

fn engine(trail_capacity: usize) -> (RenderLoopDriver, Sender<VehicleUpdate>) {
    let (tx, rx) = bounded(64);
    let mut imagery = ImageryCatalog::new();
    imagery.register(Box::new(Solid));
    let driver = RenderLoopDriver::new(
        Collaborators {
            vehicle: Box::new(ChannelVehicleSource::new(rx)),
            waypoints: Box::new(WaypointList::new()),
            sensor: None,
            imagery,
            models: ModelCatalog::builtin(),
        },
        ViewSettings {
            toggles: ViewToggles::default(),
            frame: ReferenceFrame::LocalNed,
            map_source: Some(0),
            vehicle_model: 0,
            trail_capacity,
            viewport: [1024.0, 768.0],
        },
    );
    (driver, tx)
}

fn at(ned: DVec3, fix: bool) -> VehicleUpdate {
    let plane = LocalTangentPlane::new(Geodetic::new(HOME.0, HOME.1, HOME.2)).unwrap();
    VehicleUpdate {
        vehicle_id: 1,
        state: VehicleState {
            local_ned: ned,
            attitude: Attitude::default(),
            geodetic: fix.then(|| plane.to_geodetic([ned.y, ned.x, -ned.z]).unwrap()),
        },
    }
}

/// Straight down onto the ground point `(east, north)`.
fn ray_down(east: f64, north: f64) -> Ray {
    Ray::new(DVec3::new(east, north, 200.0), DVec3::NEG_Z)
}

#[test]
fn imagery_appears_once_georeferenced() {
    let (mut d, tx) = engine(100);

    tx.send(at(DVec3::new(1.0, 0.0, -10.0), false)).unwrap();
    d.frame();
    assert!(!d.transformer().is_global_available());
    assert!(d.scene().node(FeatureKey::Imagery).is_none());

    tx.send(at(DVec3::new(2.0, 0.0, -10.0), true)).unwrap();
    let report = d.frame();
    assert!(d.transformer().is_global_available());
    assert!(report.rebuilt.contains(&FeatureKey::Imagery));
    let node = d.scene().node(FeatureKey::Imagery).unwrap();
    assert!(!node.tiles.is_empty());

    assert!(d.select_map_source(None));
    assert!(d.scene().node(FeatureKey::Imagery).is_none());
    assert!(!d.select_map_source(Some(7)));
}

#[test]
fn pick_and_insert_waypoint() {
    let (mut d, tx) = engine(100);
    tx.send(at(DVec3::new(5.0, 0.0, -12.0), false)).unwrap();
    d.frame();

    // Without the pick modifier the press belongs to the camera.
    let plain = d.pointer(PointerInput::Press {
        ray: ray_down(20.0, 30.0),
        pick: false,
    });
    assert_eq!(plain, Reaction::Ignored);

    let reaction = d.pointer(PointerInput::Press {
        ray: ray_down(20.0, 30.0),
        pick: true,
    });
    assert_eq!(reaction, Reaction::MenuOpened);
    let Some(Menu::Insert { at, target }) = d.pending_menu().copied() else {
        panic!("expected an insert menu");
    };
    assert!(!target);
    // The work plane sits at the vehicle's altitude.
    assert!((at - DVec3::new(30.0, 20.0, -12.0)).length() < 1e-9);

    assert_eq!(d.apply_menu(MenuAction::InsertWaypoint), Reaction::Committed);
    assert!(d.pending_menu().is_none());
    assert_eq!(d.waypoints().len(), 1);

    let report = d.frame();
    assert!(report.rebuilt.contains(&FeatureKey::Waypoints));
    assert!(d.scene().is_attached(FeatureKey::Waypoints));
    let markers = d.waypoint_markers();
    assert_eq!(markers.len(), 1);
    assert!((markers[0].1 - DVec3::new(20.0, 30.0, 12.0)).length() < 1e-9);
}

#[test]
fn move_waypoint_keeps_altitude() {
    let (mut d, tx) = engine(100);
    tx.send(at(DVec3::new(1.0, 0.0, -15.0), false)).unwrap();
    d.frame();

    d.pointer(PointerInput::Press {
        ray: ray_down(0.0, 10.0),
        pick: true,
    });
    d.apply_menu(MenuAction::InsertWaypoint);
    d.frame();

    // Hit the marker itself.
    let reaction = d.pointer(PointerInput::Press {
        ray: ray_down(0.0, 10.0),
        pick: true,
    });
    assert_eq!(reaction, Reaction::MenuOpened);
    assert!(matches!(d.pending_menu(), Some(Menu::Edit { index: 0, .. })));
    assert_eq!(d.apply_menu(MenuAction::MoveWaypoint), Reaction::Consumed);

    assert_eq!(
        d.pointer(PointerInput::Move(ray_down(40.0, 10.0))),
        Reaction::PreviewChanged
    );
    assert_eq!(d.waypoints().get(0).unwrap().position.y, 0.0);

    assert_eq!(d.commit(), Reaction::Committed);
    let wp = *d.waypoints().get(0).unwrap();
    assert!((wp.position - DVec3::new(10.0, 40.0, -15.0)).length() < 1e-9);
}

fn tile_corners(d: &RenderLoopDriver) -> Vec<(TileKey, [DVec3; 4])> {
    d.scene()
        .node(FeatureKey::Imagery)
        .unwrap()
        .tiles
        .iter()
        .map(|t| (t.key, t.corners))
        .collect()
}

#[test]
fn toggles_round_trip() {
    let (mut d, tx) = engine(100);
    for north in [1.0, 2.0, 3.0] {
        tx.send(at(DVec3::new(north, 1.0, -5.0), true)).unwrap();
        d.frame();
    }
    d.pointer(PointerInput::Press {
        ray: ray_down(10.0, 40.0),
        pick: true,
    });
    d.apply_menu(MenuAction::InsertWaypoint);
    d.frame();

    for toggle in [Toggle::Grid, Toggle::Trail, Toggle::Waypoints, Toggle::Imagery] {
        assert!(d.toggles().get(toggle), "{} starts on", toggle.label());
    }
    let trail = d.scene().node(FeatureKey::Trail).unwrap().parts.clone();
    let waypoints = d.scene().node(FeatureKey::Waypoints).unwrap().parts.clone();
    let tiles = tile_corners(&d);
    assert!(!tiles.is_empty());

    for toggle in [Toggle::Grid, Toggle::Trail, Toggle::Waypoints, Toggle::Imagery] {
        assert!(!d.toggle(toggle));
        assert!(!d.toggles().get(toggle));
    }
    assert_eq!(d.scene().attached().count(), 1, "only the vehicle is left");
    d.frame();
    for toggle in [Toggle::Grid, Toggle::Trail, Toggle::Waypoints, Toggle::Imagery] {
        assert!(d.toggle(toggle));
    }
    d.frame();

    assert_eq!(d.scene().node(FeatureKey::Trail).unwrap().parts, trail);
    assert_eq!(d.scene().node(FeatureKey::Waypoints).unwrap().parts, waypoints);
    assert_eq!(tile_corners(&d), tiles);
    for key in [
        FeatureKey::Grid,
        FeatureKey::Trail,
        FeatureKey::Waypoints,
        FeatureKey::Imagery,
    ] {
        assert!(d.scene().is_attached(key), "{key:?} re-attached");
    }

    assert!(d.set_toggle(Toggle::Target, true));
    d.frame();
    assert!(d.target().is_enabled());
    assert!(d.scene().is_attached(FeatureKey::Target));
    assert!(!d.set_toggle(Toggle::Target, false));
    assert!(!d.scene().is_attached(FeatureKey::Target));

    // No sensor collaborator: both overlays stay off.
    assert!(!d.toggle(Toggle::Sensor3d));
    assert!(!d.toggle(Toggle::Sensor2d));
}

#[test]
fn hidden_waypoint_cannot_be_edited() {
    let (mut d, tx) = engine(100);
    tx.send(at(DVec3::new(1.0, 0.0, -10.0), false)).unwrap();
    d.frame();
    d.pointer(PointerInput::Press {
        ray: ray_down(15.0, 25.0),
        pick: true,
    });
    d.apply_menu(MenuAction::InsertWaypoint);
    d.frame();

    assert!(!d.toggle(Toggle::Waypoints));
    let reaction = d.pointer(PointerInput::Press {
        ray: ray_down(15.0, 25.0),
        pick: true,
    });
    assert_eq!(reaction, Reaction::MenuOpened);
    assert!(!matches!(d.pending_menu(), Some(Menu::Edit { .. })));
    assert_ne!(d.apply_menu(MenuAction::DeleteWaypoint), Reaction::Committed);
    assert_eq!(d.waypoints().len(), 1);
}

#[test]
fn trail_keeps_newest_points() {
    let (mut d, tx) = engine(10);
    for i in 1..=25 {
        tx.send(at(DVec3::new(i as f64, 0.0, -10.0), false)).unwrap();
        d.frame();
    }
    assert_eq!(d.trail().len(), 10);
    let points = d.trail().snapshot();
    assert_eq!(points.first().unwrap().x, 16.0);
    assert_eq!(points.last().unwrap().x, 25.0);
    let trail = d.scene().node(FeatureKey::Trail).unwrap();
    assert_eq!(trail.parts[0].vertices.len(), 10);
}

#[test]
fn clear_all_empties_store_and_scene() {
    let (mut d, tx) = engine(100);
    tx.send(at(DVec3::new(1.0, 0.0, -8.0), false)).unwrap();
    d.frame();
    for east in [10.0, 20.0, 30.0] {
        d.pointer(PointerInput::Press {
            ray: ray_down(east, 50.0),
            pick: true,
        });
        d.apply_menu(MenuAction::InsertWaypoint);
    }
    d.frame();
    assert_eq!(d.waypoints().len(), 3);
    assert!(d.scene().node(FeatureKey::Waypoints).is_some());

    d.clear_all();
    d.frame();
    assert!(d.waypoints().is_empty());
    assert!(d.scene().node(FeatureKey::Waypoints).is_none());
}

#[test]
fn reference_frame_switch_clears_trail() {
    let (mut d, tx) = engine(100);
    for i in 1..=3 {
        tx.send(at(DVec3::new(i as f64, 0.0, -10.0), true)).unwrap();
        d.frame();
    }
    assert_eq!(d.trail().len(), 3);
    d.set_reference_frame(ReferenceFrame::Global);
    assert!(d.trail().is_empty());
    assert!(!d.scene().is_attached(FeatureKey::Trail));
    assert_eq!(d.pose().unwrap().frame, ReferenceFrame::Global);
}
