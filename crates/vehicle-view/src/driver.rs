//! Per-frame orchestration of the engine.
//!
//! One frame: drain telemetry to the newest snapshot, transform it, extend
//! the trail, refresh the affected scene nodes, refresh the HUD, move the
//! camera if it follows the vehicle, then ask for a redraw. Without a new
//! snapshot only interaction-driven rebuilds happen.

use crate::camera::Camera;
use crate::frames::{CoordinateTransformer, RenderPose};
use crate::hud::HudOverlay;
use crate::interaction::{
    InteractionWorld, Menu, MenuAction, PointerInput, Reaction, TargetState,
    WaypointInteractionController,
};
use crate::picking::{marker_radius, Ray};
use crate::pose::{ReferenceFrame, VehiclePose, VehicleState};
use crate::scene::imagery::{ImageryCatalog, ImageryLayer, ImageryUpdate};
use crate::scene::models::ModelCatalog;
use crate::scene::sensor::{back_project, cloud_geometry, RgbdFrame, SensorSource, CLOUD_STRIDE};
use crate::scene::{shapes, FeatureKey, Geometry, Primitive, SceneNode, SceneNodeSet};
use crate::trail::TrailBuffer;
use crate::waypoint::WaypointStore;
use crossbeam_channel::Receiver;
use glam::{DMat4, DVec3};

/// Minimum per-axis change before a trail point is recorded, meters.
const TRAIL_MIN_STEP_M: f64 = 0.01;
const GRID_HALF_EXTENT_M: f64 = 500.0;
const GRID_SPACING_M: f64 = 10.0;
/// Relative change of the marker radius that redraws the waypoint rings.
const MARKER_RESIZE_RATIO: f64 = 0.05;

/// Telemetry as produced by the vehicle link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleUpdate {
    pub vehicle_id: u32,
    pub state: VehicleState,
}

/// Where vehicle snapshots come from.
pub trait VehicleStateSource {
    /// Newest snapshot since the previous call.
    fn latest(&mut self) -> Option<VehicleState>;

    /// Identity of the vehicle the last snapshot belonged to.
    fn vehicle_id(&self) -> u32;
}

/// Vehicle source fed by a producer thread over a bounded channel.
pub struct ChannelVehicleSource {
    rx: Receiver<VehicleUpdate>,
    vehicle_id: u32,
}

impl ChannelVehicleSource {
    pub fn new(rx: Receiver<VehicleUpdate>) -> Self {
        Self { rx, vehicle_id: 0 }
    }
}

impl VehicleStateSource for ChannelVehicleSource {
    fn latest(&mut self) -> Option<VehicleState> {
        let update = self.rx.try_iter().last()?;
        self.vehicle_id = update.vehicle_id;
        Some(update.state)
    }

    fn vehicle_id(&self) -> u32 {
        self.vehicle_id
    }
}

/// Runtime visibility and behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewToggles {
    pub grid: bool,
    pub trail: bool,
    pub waypoints: bool,
    pub imagery: bool,
    pub sensor_2d: bool,
    pub sensor_3d: bool,
    pub sensor_color: bool,
    pub target: bool,
    pub follow_camera: bool,
}

impl Default for ViewToggles {
    fn default() -> Self {
        Self {
            grid: true,
            trail: true,
            waypoints: true,
            imagery: true,
            sensor_2d: false,
            sensor_3d: false,
            sensor_color: false,
            target: false,
            follow_camera: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Grid,
    Trail,
    Waypoints,
    Imagery,
    Sensor2d,
    Sensor3d,
    SensorColor,
    Target,
    FollowCamera,
}

impl Toggle {
    pub const ALL: [Toggle; 9] = [
        Toggle::Grid,
        Toggle::Trail,
        Toggle::Waypoints,
        Toggle::Imagery,
        Toggle::Sensor2d,
        Toggle::Sensor3d,
        Toggle::SensorColor,
        Toggle::Target,
        Toggle::FollowCamera,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Toggle::Grid => "Grid",
            Toggle::Trail => "Trail",
            Toggle::Waypoints => "Waypoints",
            Toggle::Imagery => "Imagery",
            Toggle::Sensor2d => "2D sensor overlay",
            Toggle::Sensor3d => "3D sensor overlay",
            Toggle::SensorColor => "Sensor color",
            Toggle::Target => "Target designation",
            Toggle::FollowCamera => "Follow camera",
        }
    }
}

impl ViewToggles {
    pub fn get(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Grid => self.grid,
            Toggle::Trail => self.trail,
            Toggle::Waypoints => self.waypoints,
            Toggle::Imagery => self.imagery,
            Toggle::Sensor2d => self.sensor_2d,
            Toggle::Sensor3d => self.sensor_3d,
            Toggle::SensorColor => self.sensor_color,
            Toggle::Target => self.target,
            Toggle::FollowCamera => self.follow_camera,
        }
    }

    fn set(&mut self, toggle: Toggle, on: bool) {
        let flag = match toggle {
            Toggle::Grid => &mut self.grid,
            Toggle::Trail => &mut self.trail,
            Toggle::Waypoints => &mut self.waypoints,
            Toggle::Imagery => &mut self.imagery,
            Toggle::Sensor2d => &mut self.sensor_2d,
            Toggle::Sensor3d => &mut self.sensor_3d,
            Toggle::SensorColor => &mut self.sensor_color,
            Toggle::Target => &mut self.target,
            Toggle::FollowCamera => &mut self.follow_camera,
        };
        *flag = on;
    }
}

/// External collaborators the engine reads from and writes to.
pub struct Collaborators {
    pub vehicle: Box<dyn VehicleStateSource>,
    pub waypoints: Box<dyn WaypointStore>,
    pub sensor: Option<Box<dyn SensorSource>>,
    pub imagery: ImageryCatalog,
    pub models: ModelCatalog,
}

/// Initial view settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub toggles: ViewToggles,
    pub frame: ReferenceFrame,
    pub map_source: Option<usize>,
    pub vehicle_model: usize,
    pub trail_capacity: usize,
    pub viewport: [f32; 2],
}

/// What a frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub pose_updated: bool,
    /// Features whose geometry was replaced this frame.
    pub rebuilt: Vec<FeatureKey>,
    pub redraw: bool,
}

pub struct RenderLoopDriver {
    vehicle: Box<dyn VehicleStateSource>,
    store: Box<dyn WaypointStore>,
    sensor: Option<Box<dyn SensorSource>>,
    imagery_catalog: ImageryCatalog,
    models: ModelCatalog,

    transformer: CoordinateTransformer,
    trail: TrailBuffer,
    scene: SceneNodeSet,
    hud: HudOverlay,
    camera: Camera,
    controller: WaypointInteractionController,
    target: TargetState,
    imagery: ImageryLayer,
    toggles: ViewToggles,
    model_index: usize,

    vehicle_id: Option<u32>,
    pose: Option<VehiclePose>,
    render_pose: Option<RenderPose>,
    georeferenced: bool,
    waypoint_revision: Option<u64>,
    waypoints_dirty: bool,
    /// Ring radius the waypoint node was built with.
    waypoint_marker_radius: f64,
    target_dirty: bool,
    sensor_frame: Option<RgbdFrame>,
    sensor_generation: u64,
    viewport: [f32; 2],
}

impl RenderLoopDriver {
    pub fn new(collaborators: Collaborators, settings: ViewSettings) -> Self {
        let Collaborators {
            vehicle,
            waypoints,
            sensor,
            imagery,
            models,
        } = collaborators;
        let [w, h] = settings.viewport;

        let mut driver = Self {
            vehicle,
            store: waypoints,
            sensor,
            imagery_catalog: imagery,
            models,
            transformer: CoordinateTransformer::new(settings.frame),
            trail: TrailBuffer::new(settings.trail_capacity),
            scene: SceneNodeSet::new(),
            hud: HudOverlay::new(w, h),
            camera: Camera::new(w.max(1.0) as f64 / h.max(1.0) as f64),
            controller: WaypointInteractionController::new(),
            target: TargetState::default(),
            imagery: ImageryLayer::new(None),
            toggles: ViewToggles {
                grid: false,
                trail: false,
                waypoints: false,
                imagery: false,
                sensor_2d: false,
                sensor_3d: false,
                sensor_color: false,
                target: false,
                follow_camera: false,
            },
            model_index: 0,
            vehicle_id: None,
            pose: None,
            render_pose: None,
            georeferenced: false,
            waypoint_revision: None,
            waypoints_dirty: true,
            waypoint_marker_radius: 0.0,
            target_dirty: true,
            sensor_frame: None,
            sensor_generation: 0,
            viewport: [w, h],
        };

        driver.select_map_source(settings.map_source);
        if !driver.select_vehicle_model(settings.vehicle_model) {
            driver.select_vehicle_model(0);
        }
        for toggle in Toggle::ALL {
            driver.set_toggle(toggle, settings.toggles.get(toggle));
        }
        driver
    }

    // --- Frame ---

    pub fn frame(&mut self) -> FrameReport {
        let mut report = FrameReport::default();

        if let Some(state) = self.vehicle.latest() {
            let id = self.vehicle.vehicle_id();
            if self.vehicle_id != Some(id) {
                if self.vehicle_id.is_some() {
                    log::info!("Active vehicle changed to {id}; resetting view state");
                    self.reset_vehicle();
                }
                self.vehicle_id = Some(id);
            }

            let pose = self.transformer.ingest(&state);
            let render = self.transformer.render_pose(&pose);

            if self.transformer.is_global_available() != self.georeferenced {
                self.georeferenced = self.transformer.is_global_available();
                self.waypoints_dirty = true;
                self.target_dirty = true;
                self.imagery.invalidate();
            }

            if self.toggles.trail && self.record_trail_point(pose.position) {
                self.rebuild_trail(&mut report);
            }

            self.scene.set_transform(FeatureKey::Vehicle, render.model);
            self.place_grid(render.position);
            self.update_imagery(&pose, &mut report);
            self.update_sensor(&pose, &mut report);
            self.hud.update_pose(&pose, &self.transformer);

            if self.toggles.follow_camera {
                match self.render_pose {
                    Some(prev) => self
                        .camera
                        .follow(render.position - prev.position, render.heading - prev.heading),
                    None => self.camera.recenter(render.position, render.heading),
                }
            }

            self.pose = Some(pose);
            self.render_pose = Some(render);
            report.pose_updated = true;
        }

        if !self.controller.validate(&*self.store) {
            self.waypoints_dirty = true;
        }
        if self.waypoint_revision != Some(self.store.revision()) {
            self.waypoints_dirty = true;
        }
        let radius = marker_radius(self.camera.radius_m);
        if (radius - self.waypoint_marker_radius).abs()
            > self.waypoint_marker_radius * MARKER_RESIZE_RATIO
        {
            self.waypoints_dirty = true;
        }
        if self.waypoints_dirty {
            self.rebuild_waypoints(&mut report);
        }
        if self.target_dirty {
            self.rebuild_target(&mut report);
        }
        self.scale_target_marker();
        self.hud
            .update_scale(self.camera.meters_per_pixel(self.viewport[1]));

        report.redraw = true;
        report
    }

    fn reset_vehicle(&mut self) {
        self.cancel();
        self.transformer.reset();
        self.trail.clear();
        self.target.disable();
        self.toggles.target = false;
        self.scene.set_visible(FeatureKey::Target, false);
        for key in [
            FeatureKey::Trail,
            FeatureKey::Imagery,
            FeatureKey::Target,
            FeatureKey::SensorCloud,
        ] {
            self.scene.clear(key);
        }
        self.imagery.invalidate();
        self.georeferenced = false;
        self.pose = None;
        self.render_pose = None;
        self.sensor_frame = None;
        self.waypoints_dirty = true;
    }

    /// Skips duplicates and the all-zero position of an uninitialised source.
    fn record_trail_point(&mut self, ned: DVec3) -> bool {
        if ned == DVec3::ZERO {
            return false;
        }
        if let Some(last) = self.trail.latest() {
            if (ned - last).abs().max_element() <= TRAIL_MIN_STEP_M {
                return false;
            }
        }
        self.trail.append(ned);
        true
    }

    fn rebuild_trail(&mut self, report: &mut FrameReport) {
        let points: Vec<DVec3> = self
            .trail
            .iter()
            .map(CoordinateTransformer::local_to_render)
            .collect();
        let node = (points.len() >= 2).then(|| {
            SceneNode::new(vec![Geometry::uniform(
                Primitive::LineStrip,
                points,
                shapes::TRAIL,
            )])
        });
        self.scene.replace(FeatureKey::Trail, node);
        report.rebuilt.push(FeatureKey::Trail);
    }

    /// The grid is static geometry; only its anchor snaps along with the vehicle.
    fn place_grid(&mut self, vehicle_render: DVec3) {
        let snap = |v: f64| (v / GRID_SPACING_M).round() * GRID_SPACING_M;
        self.scene.set_transform(
            FeatureKey::Grid,
            DMat4::from_translation(DVec3::new(
                snap(vehicle_render.x),
                snap(vehicle_render.y),
                0.0,
            )),
        );
    }

    fn update_imagery(&mut self, pose: &VehiclePose, report: &mut FrameReport) {
        if !self.scene.is_visible(FeatureKey::Imagery) {
            return;
        }
        match self.imagery.update(
            &self.imagery_catalog,
            &self.transformer,
            pose.position,
            self.camera.radius_m,
        ) {
            ImageryUpdate::Keep => {}
            ImageryUpdate::Replace(node) => {
                self.scene.replace(FeatureKey::Imagery, Some(node));
                report.rebuilt.push(FeatureKey::Imagery);
            }
            ImageryUpdate::Remove => {
                if self.scene.node(FeatureKey::Imagery).is_some() {
                    self.scene.clear(FeatureKey::Imagery);
                    report.rebuilt.push(FeatureKey::Imagery);
                }
            }
        }
    }

    fn update_sensor(&mut self, pose: &VehiclePose, report: &mut FrameReport) {
        if !(self.toggles.sensor_2d || self.toggles.sensor_3d) {
            return;
        }
        let Some(frame) = self.sensor.as_mut().and_then(|s| s.latest()) else {
            return;
        };

        if self.toggles.sensor_3d {
            let points = back_project(&frame, CLOUD_STRIDE, self.toggles.sensor_color);
            let transformer = &self.transformer;
            let geometry = cloud_geometry(&points, |body| {
                CoordinateTransformer::local_to_render(transformer.body_to_local(pose, body))
            });
            self.scene
                .replace(FeatureKey::SensorCloud, Some(SceneNode::new(vec![geometry])));
            report.rebuilt.push(FeatureKey::SensorCloud);
        }

        self.sensor_generation += 1;
        self.sensor_frame = Some(frame);
    }

    fn rebuild_waypoints(&mut self, report: &mut FrameReport) {
        self.waypoints_dirty = false;
        self.waypoint_revision = Some(self.store.revision());

        let radius = marker_radius(self.camera.radius_m);
        self.waypoint_marker_radius = radius;
        let selected = self.controller.selected();
        let preview = self.controller.preview();

        let mut rings = Geometry::new(Primitive::Lines);
        let mut drops = Geometry::new(Primitive::Lines);
        let mut path = Geometry::new(Primitive::LineStrip);

        for (i, p) in self.waypoint_positions_with(preview) {
            let color = if selected == Some(i) {
                shapes::WAYPOINT_SELECTED
            } else {
                shapes::WAYPOINT
            };
            shapes::ring(&mut rings, p, radius, 24, color);
            drops.push(p, shapes::DROP_LINE);
            drops.push(DVec3::new(p.x, p.y, 0.0), shapes::DROP_LINE);
            path.push(p, shapes::WAYPOINT_PATH);
        }

        let node = if rings.is_empty() {
            None
        } else {
            let mut parts = vec![rings, drops];
            if path.vertices.len() >= 2 {
                parts.push(path);
            }
            Some(SceneNode::new(parts))
        };
        self.scene.replace(FeatureKey::Waypoints, node);
        report.rebuilt.push(FeatureKey::Waypoints);
    }

    fn rebuild_target(&mut self, report: &mut FrameReport) {
        self.target_dirty = false;
        let node = self.target.local(&self.transformer).map(|ned| {
            SceneNode::new(vec![shapes::target_marker(1.0)]).with_transform(
                DMat4::from_translation(CoordinateTransformer::local_to_render(ned)),
            )
        });
        self.scene.replace(FeatureKey::Target, node);
        report.rebuilt.push(FeatureKey::Target);
    }

    fn scale_target_marker(&mut self) {
        if let Some(node) = self.scene.node(FeatureKey::Target) {
            let at = node.transform.w_axis.truncate();
            let r = marker_radius(self.camera.radius_m);
            self.scene.set_transform(
                FeatureKey::Target,
                DMat4::from_translation(at) * DMat4::from_scale(DVec3::splat(r)),
            );
        }
    }

    /// Render-space waypoint positions, the moving one at its preview.
    fn waypoint_positions_with(&self, preview: Option<(usize, DVec3)>) -> Vec<(usize, DVec3)> {
        self.store
            .waypoints()
            .iter()
            .enumerate()
            .filter_map(|(i, wp)| {
                let ned = match preview {
                    Some((j, p)) if j == i => p,
                    _ => self.transformer.waypoint_to_local(wp).ok()?,
                };
                Some((i, CoordinateTransformer::local_to_render(ned)))
            })
            .collect()
    }

    // --- Runtime operations ---

    /// Applies a toggle immediately. Returns the resulting state, which is
    /// `false` when the feature's resource is unavailable.
    pub fn set_toggle(&mut self, toggle: Toggle, on: bool) -> bool {
        let mut on = on;
        match toggle {
            Toggle::Grid => {
                if on && self.scene.node(FeatureKey::Grid).is_none() {
                    let grid = shapes::grid(GRID_HALF_EXTENT_M, GRID_SPACING_M, 10);
                    self.scene
                        .replace(FeatureKey::Grid, Some(SceneNode::new(vec![grid])));
                    if let Some(r) = self.render_pose {
                        self.place_grid(r.position);
                    }
                }
                self.scene.set_visible(FeatureKey::Grid, on);
            }
            Toggle::Trail => {
                self.scene.set_visible(FeatureKey::Trail, on);
            }
            Toggle::Waypoints => {
                if !on && self.controller.release_waypoints() != Reaction::Ignored {
                    self.waypoints_dirty = true;
                }
                self.scene.set_visible(FeatureKey::Waypoints, on);
            }
            Toggle::Imagery => {
                self.scene.set_visible(FeatureKey::Imagery, on);
            }
            Toggle::Sensor2d | Toggle::Sensor3d => {
                if on && self.sensor.is_none() {
                    log::warn!("{} unavailable: no sensor source", toggle.label());
                    on = false;
                }
                if toggle == Toggle::Sensor2d {
                    self.hud.set_sensor_windows(on);
                } else {
                    self.scene.set_visible(FeatureKey::SensorCloud, on);
                }
            }
            Toggle::SensorColor => {}
            Toggle::Target => {
                if on {
                    let vehicle = self.pose.map(|p| p.position).unwrap_or(DVec3::ZERO);
                    if let Err(e) = self.target.enable(&self.transformer, vehicle) {
                        log::warn!("Target designation unavailable: {e}");
                        on = false;
                    }
                } else {
                    if self.controller.is_dragging_target() {
                        self.cancel();
                    }
                    self.target.disable();
                }
                self.scene.set_visible(FeatureKey::Target, on);
                self.target_dirty = true;
            }
            Toggle::FollowCamera => {}
        }
        self.toggles.set(toggle, on);
        on
    }

    pub fn toggle(&mut self, toggle: Toggle) -> bool {
        let current = self.toggles.get(toggle);
        self.set_toggle(toggle, !current)
    }

    pub fn set_reference_frame(&mut self, frame: ReferenceFrame) {
        if self.transformer.frame() == frame {
            return;
        }
        log::info!("Reference frame set to {}", frame.label());
        self.transformer.set_frame(frame);
        self.trail.clear();
        self.scene.clear(FeatureKey::Trail);
        if let Some(pose) = self.pose.as_mut() {
            pose.frame = frame;
            self.hud.update_pose(pose, &self.transformer);
        }
    }

    /// `None` removes imagery. Out-of-range indices are ignored.
    pub fn select_map_source(&mut self, selection: Option<usize>) -> bool {
        if let Some(i) = selection {
            if i >= self.imagery_catalog.len() {
                log::warn!("No imagery source at index {i}");
                return false;
            }
        }
        if self.imagery.select(selection) {
            let street = selection
                .and_then(|i| self.imagery_catalog.get(i))
                .map_or(false, |s| s.street_map());
            self.hud.set_theme(street);
            if selection.is_none() {
                self.scene.clear(FeatureKey::Imagery);
            }
        }
        true
    }

    pub fn select_vehicle_model(&mut self, index: usize) -> bool {
        let Some(model) = self.models.get(index) else {
            log::warn!("No vehicle model at index {index}");
            return false;
        };
        let transform = self
            .render_pose
            .map_or(DMat4::IDENTITY, |r| r.model);
        self.scene.replace(
            FeatureKey::Vehicle,
            Some(SceneNode::new(vec![model.geometry.clone()]).with_transform(transform)),
        );
        self.scene.set_visible(FeatureKey::Vehicle, true);
        self.model_index = index;
        true
    }

    /// One-shot: put the camera behind the vehicle.
    pub fn recenter(&mut self) {
        if let Some(r) = self.render_pose {
            self.camera.recenter(r.position, r.heading);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = [width as f32, height as f32];
        self.camera.set_aspect(width, height);
        self.hud.resize(width as f32, height as f32);
    }

    /// Ground position under the pointer for the HUD.
    pub fn hover(&mut self, ray: Option<Ray>) {
        let ground = ray.and_then(|r| {
            r.intersect_horizontal(0.0)
                .map(|t| CoordinateTransformer::render_to_local(r.at(t)))
        });
        self.hud.update_cursor(ground, &self.transformer);
    }

    // --- Interaction ---

    fn with_world<R>(
        &mut self,
        f: impl FnOnce(&mut WaypointInteractionController, &mut InteractionWorld) -> R,
    ) -> R {
        let mut world = InteractionWorld {
            store: &mut *self.store,
            transformer: &self.transformer,
            target: &mut self.target,
            vehicle: self.pose.map(|p| p.position).unwrap_or(DVec3::ZERO),
            pick_radius: marker_radius(self.camera.radius_m),
            waypoints_pickable: self.scene.is_attached(FeatureKey::Waypoints),
        };
        f(&mut self.controller, &mut world)
    }

    fn note(&mut self, reaction: Reaction) -> Reaction {
        if reaction != Reaction::Ignored {
            self.waypoints_dirty = true;
            self.target_dirty = true;
        }
        reaction
    }

    pub fn pointer(&mut self, input: PointerInput) -> Reaction {
        let r = self.with_world(|c, w| c.on_pointer(input, w));
        self.note(r)
    }

    pub fn apply_menu(&mut self, action: MenuAction) -> Reaction {
        let r = self.with_world(|c, w| c.apply(action, w));
        self.note(r)
    }

    pub fn commit(&mut self) -> Reaction {
        let r = self.with_world(|c, w| c.commit(w));
        self.note(r)
    }

    pub fn cancel(&mut self) -> Reaction {
        let r = self.with_world(|c, w| c.cancel(w));
        self.note(r)
    }

    pub fn clear_all(&mut self) {
        self.with_world(|c, w| c.clear_all(w));
        self.note(Reaction::Committed);
    }

    pub fn dismiss_menu(&mut self) {
        self.controller.dismiss_menu();
        self.waypoints_dirty = true;
    }

    // --- Accessors ---

    pub fn scene(&self) -> &SceneNodeSet {
        &self.scene
    }

    pub fn hud(&self) -> &HudOverlay {
        &self.hud
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn toggles(&self) -> ViewToggles {
        self.toggles
    }

    pub fn controller(&self) -> &WaypointInteractionController {
        &self.controller
    }

    pub fn pending_menu(&self) -> Option<&Menu> {
        self.controller.pending_menu()
    }

    pub fn waypoints(&self) -> &dyn WaypointStore {
        &*self.store
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    pub fn target(&self) -> &TargetState {
        &self.target
    }

    pub fn pose(&self) -> Option<&VehiclePose> {
        self.pose.as_ref()
    }

    /// Latest RGB-D frame with a counter that changes on every new frame.
    pub fn sensor_frame(&self) -> Option<(u64, &RgbdFrame)> {
        self.sensor_frame
            .as_ref()
            .map(|f| (self.sensor_generation, f))
    }

    pub fn imagery_catalog(&self) -> &ImageryCatalog {
        &self.imagery_catalog
    }

    pub fn map_source(&self) -> Option<usize> {
        self.imagery.selection()
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn vehicle_model(&self) -> usize {
        self.model_index
    }

    /// Render-space positions of the displayed waypoints.
    pub fn waypoint_markers(&self) -> Vec<(usize, DVec3)> {
        self.waypoint_positions_with(self.controller.preview())
    }
}
