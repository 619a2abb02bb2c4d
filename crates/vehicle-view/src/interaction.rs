//! Waypoint editing driven by pointer input and 3D picking.
//!
//! The controller never owns the waypoints: every mutation goes through the
//! [`WaypointStore`] it is handed, and every index it holds is checked
//! against that store (by position and id) before use.

use crate::frames::{CoordinateTransformer, FrameError};
use crate::picking::{pick, PickHit, Pickable, Ray};
use crate::waypoint::{Waypoint, WaypointId, WaypointStore};
use glam::DVec3;

/// Ground-plane target, UTM meters in the georeference zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    pub easting: f64,
    pub northing: f64,
}

/// Target designation: present only while enabled.
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    enabled: bool,
    point: Option<TargetPoint>,
}

impl TargetState {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn point(&self) -> Option<TargetPoint> {
        self.point
    }

    /// Starts designation with the target under the vehicle. Needs the
    /// global frame.
    pub fn enable(
        &mut self,
        transformer: &CoordinateTransformer,
        vehicle_ned: DVec3,
    ) -> Result<(), FrameError> {
        if self.enabled {
            return Ok(());
        }
        let utm = transformer.local_to_utm(DVec3::new(vehicle_ned.x, vehicle_ned.y, 0.0))?;
        self.enabled = true;
        self.point = Some(TargetPoint {
            easting: utm.easting,
            northing: utm.northing,
        });
        Ok(())
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.point = None;
    }

    /// Moves the target to a local ground point.
    pub fn set_local(
        &mut self,
        transformer: &CoordinateTransformer,
        ned: DVec3,
    ) -> Result<(), FrameError> {
        if !self.enabled {
            return Ok(());
        }
        let utm = transformer.local_to_utm(DVec3::new(ned.x, ned.y, 0.0))?;
        self.point = Some(TargetPoint {
            easting: utm.easting,
            northing: utm.northing,
        });
        Ok(())
    }

    /// Local NED ground position of the target.
    pub fn local(&self, transformer: &CoordinateTransformer) -> Option<DVec3> {
        let p = self.point.filter(|_| self.enabled)?;
        transformer.utm_to_ground(p.easting, p.northing).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetDrag {
    /// Restored on cancel.
    start: Option<TargetPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionMode {
    Default {
        drag: Option<TargetDrag>,
    },
    MoveWaypoint {
        index: usize,
        id: WaypointId,
        /// Live position, local NED.
        preview: Option<DVec3>,
    },
}

impl Default for InteractionMode {
    fn default() -> Self {
        InteractionMode::Default { drag: None }
    }
}

/// Context menu the UI should show after a pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Menu {
    /// A waypoint was hit.
    Edit { index: usize, id: WaypointId },
    /// Empty work plane was hit at `at` (local NED).
    Insert { at: DVec3, target: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuAction {
    MoveWaypoint,
    /// Absolute altitude, meters up.
    SetAltitude(f64),
    DeleteWaypoint,
    InsertWaypoint,
    SetTarget,
    ClearAll,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// `pick` is the pick modifier (Shift).
    Press { ray: Ray, pick: bool },
    Move(Ray),
    Release,
}

/// What the controller did with an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Not for us; the camera may use it.
    Ignored,
    Consumed,
    MenuOpened,
    /// Move preview or target changed; the scene must be refreshed.
    PreviewChanged,
    Committed,
    Cancelled,
}

/// Borrowed state the controller operates on.
pub struct InteractionWorld<'a> {
    pub store: &'a mut dyn WaypointStore,
    pub transformer: &'a CoordinateTransformer,
    pub target: &'a mut TargetState,
    /// Vehicle position, local NED; its altitude is the insert work plane.
    pub vehicle: DVec3,
    /// Marker pick radius, meters.
    pub pick_radius: f64,
    /// Waypoint markers are on screen and may be picked or edited.
    pub waypoints_pickable: bool,
}

#[derive(Debug, Default)]
pub struct WaypointInteractionController {
    mode: InteractionMode,
    menu: Option<Menu>,
}

impl WaypointInteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn pending_menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn dismiss_menu(&mut self) {
        self.menu = None;
    }

    /// Waypoint being edited, for highlighting.
    pub fn selected(&self) -> Option<usize> {
        match (&self.mode, &self.menu) {
            (InteractionMode::MoveWaypoint { index, .. }, _) => Some(*index),
            (_, Some(Menu::Edit { index, .. })) => Some(*index),
            _ => None,
        }
    }

    /// Live position of the waypoint being moved, local NED.
    pub fn preview(&self) -> Option<(usize, DVec3)> {
        match self.mode {
            InteractionMode::MoveWaypoint {
                index,
                preview: Some(p),
                ..
            } => Some((index, p)),
            _ => None,
        }
    }

    pub fn is_dragging_target(&self) -> bool {
        matches!(self.mode, InteractionMode::Default { drag: Some(_) })
    }

    pub fn on_pointer(&mut self, input: PointerInput, world: &mut InteractionWorld) -> Reaction {
        match self.mode {
            InteractionMode::Default { drag: Some(_) } => match input {
                PointerInput::Move(ray) => {
                    let Some(t) = ray.intersect_horizontal(0.0) else {
                        return Reaction::Consumed;
                    };
                    let ned = CoordinateTransformer::render_to_local(ray.at(t));
                    match world.target.set_local(world.transformer, ned) {
                        Ok(()) => Reaction::PreviewChanged,
                        Err(_) => Reaction::Consumed,
                    }
                }
                PointerInput::Release => self.commit(world),
                PointerInput::Press { .. } => Reaction::Consumed,
            },
            InteractionMode::Default { drag: None } => match input {
                PointerInput::Press { ray, pick } => self.press(ray, pick, world),
                _ => Reaction::Ignored,
            },
            InteractionMode::MoveWaypoint { index, id, .. } => {
                if !world.waypoints_pickable {
                    self.mode = InteractionMode::default();
                    return Reaction::Cancelled;
                }
                let Some(wp) = self.checked(index, id, world.store) else {
                    return Reaction::Cancelled;
                };
                match input {
                    PointerInput::Move(ray) => {
                        let Ok(current) = world.transformer.waypoint_to_local(&wp) else {
                            return Reaction::Consumed;
                        };
                        let Some(t) = ray.intersect_horizontal(-current.z) else {
                            return Reaction::Consumed;
                        };
                        let ned = CoordinateTransformer::render_to_local(ray.at(t));
                        self.mode = InteractionMode::MoveWaypoint {
                            index,
                            id,
                            preview: Some(ned),
                        };
                        Reaction::PreviewChanged
                    }
                    PointerInput::Press { .. } => self.commit(world),
                    PointerInput::Release => Reaction::Consumed,
                }
            }
        }
    }

    fn press(&mut self, ray: Ray, pick_modifier: bool, world: &mut InteractionWorld) -> Reaction {
        self.menu = None;

        let mut markers = Vec::new();
        if pick_modifier && world.waypoints_pickable {
            for (i, wp) in world.store.waypoints().iter().enumerate() {
                if let Ok(ned) = world.transformer.waypoint_to_local(wp) {
                    markers.push((
                        Pickable::Waypoint(i),
                        CoordinateTransformer::local_to_render(ned),
                    ));
                }
            }
        }
        if let Some(ned) = world.target.local(world.transformer) {
            markers.push((Pickable::Target, CoordinateTransformer::local_to_render(ned)));
        }
        let plane = pick_modifier.then_some(-world.vehicle.z);

        match pick(&ray, &markers, world.pick_radius, plane) {
            Some(PickHit::Marker {
                what: Pickable::Target,
                ..
            }) => {
                self.mode = InteractionMode::Default {
                    drag: Some(TargetDrag {
                        start: world.target.point(),
                    }),
                };
                Reaction::Consumed
            }
            Some(PickHit::Marker {
                what: Pickable::Waypoint(index),
                ..
            }) => {
                let id = world.store.waypoints()[index].id;
                self.menu = Some(Menu::Edit { index, id });
                Reaction::MenuOpened
            }
            Some(PickHit::Plane { point }) => {
                self.menu = Some(Menu::Insert {
                    at: CoordinateTransformer::render_to_local(point),
                    target: world.target.is_enabled() && world.transformer.is_global_available(),
                });
                Reaction::MenuOpened
            }
            None => Reaction::Ignored,
        }
    }

    /// Answers the pending menu.
    pub fn apply(&mut self, action: MenuAction, world: &mut InteractionWorld) -> Reaction {
        let Some(menu) = self.menu.take() else {
            return Reaction::Ignored;
        };

        if action == MenuAction::ClearAll {
            self.clear_all(world);
            return Reaction::Committed;
        }

        match menu {
            Menu::Edit { index, id } => {
                if !world.waypoints_pickable || self.checked(index, id, world.store).is_none() {
                    return Reaction::Cancelled;
                }
                let result = match action {
                    MenuAction::MoveWaypoint => {
                        self.mode = InteractionMode::MoveWaypoint {
                            index,
                            id,
                            preview: None,
                        };
                        return Reaction::Consumed;
                    }
                    MenuAction::SetAltitude(alt) => world.store.set_altitude(index, alt),
                    MenuAction::DeleteWaypoint => world.store.remove(index).map(|_| ()),
                    _ => return Reaction::Ignored,
                };
                match result {
                    Ok(()) => Reaction::Committed,
                    Err(e) => {
                        log::warn!("Waypoint edit rejected: {e}");
                        Reaction::Cancelled
                    }
                }
            }
            Menu::Insert { at, target } => match action {
                MenuAction::InsertWaypoint => {
                    let frame = world.transformer.frame();
                    match world.transformer.local_to_waypoint(at, frame) {
                        Ok(position) => {
                            let id = world.store.insert(position, frame);
                            log::debug!("Inserted waypoint {:?} at {:?}", id, at);
                            Reaction::Committed
                        }
                        Err(e) => {
                            log::warn!("Cannot insert waypoint: {e}");
                            Reaction::Cancelled
                        }
                    }
                }
                MenuAction::SetTarget if target => {
                    match world.target.set_local(world.transformer, at) {
                        Ok(()) => Reaction::Committed,
                        Err(_) => Reaction::Cancelled,
                    }
                }
                _ => Reaction::Ignored,
            },
        }
    }

    /// Finishes the active move or target drag.
    pub fn commit(&mut self, world: &mut InteractionWorld) -> Reaction {
        match self.mode {
            InteractionMode::Default { drag: Some(_) } => {
                self.mode = InteractionMode::default();
                Reaction::Committed
            }
            InteractionMode::Default { drag: None } => Reaction::Ignored,
            InteractionMode::MoveWaypoint { index, id, preview } => {
                self.mode = InteractionMode::default();
                let Some(wp) = self.checked(index, id, world.store) else {
                    return Reaction::Cancelled;
                };
                let Some(ned) = preview else {
                    return Reaction::Committed;
                };
                match world.transformer.local_to_waypoint(ned, wp.frame) {
                    Ok(position) => {
                        let mut moved = Waypoint { position, ..wp };
                        // Moves are horizontal.
                        moved.set_altitude(wp.altitude());
                        match world.store.set_position(index, moved.position) {
                            Ok(()) => Reaction::Committed,
                            Err(e) => {
                                log::warn!("Waypoint move rejected: {e}");
                                Reaction::Cancelled
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("Waypoint move dropped: {e}");
                        Reaction::Cancelled
                    }
                }
            }
        }
    }

    /// Drops the edit menu and any move once the waypoint markers are hidden.
    pub fn release_waypoints(&mut self) -> Reaction {
        let had_menu = matches!(self.menu, Some(Menu::Edit { .. }));
        if had_menu {
            self.menu = None;
        }
        if matches!(self.mode, InteractionMode::MoveWaypoint { .. }) {
            self.mode = InteractionMode::default();
            return Reaction::Cancelled;
        }
        if had_menu {
            Reaction::Cancelled
        } else {
            Reaction::Ignored
        }
    }

    /// Abandons the active move or drag without touching the waypoints.
    pub fn cancel(&mut self, world: &mut InteractionWorld) -> Reaction {
        self.menu = None;
        match std::mem::take(&mut self.mode) {
            InteractionMode::Default { drag: Some(drag) } => {
                if let Some(start) = drag.start {
                    world.target.point = Some(start);
                }
                Reaction::Cancelled
            }
            InteractionMode::Default { drag: None } => Reaction::Ignored,
            InteractionMode::MoveWaypoint { .. } => Reaction::Cancelled,
        }
    }

    /// Deletes every waypoint and returns to `Default`.
    pub fn clear_all(&mut self, world: &mut InteractionWorld) {
        self.cancel(world);
        world.store.clear();
        log::info!("Cleared all waypoints");
    }

    /// Drops a selection that no longer matches the store.
    pub fn validate(&mut self, store: &dyn WaypointStore) -> bool {
        if let InteractionMode::MoveWaypoint { index, id, .. } = self.mode {
            if self.checked(index, id, store).is_none() {
                return false;
            }
        }
        if let Some(Menu::Edit { index, id }) = self.menu {
            if store.get(index).map(|w| w.id) != Some(id) {
                self.menu = None;
                return false;
            }
        }
        true
    }

    /// The waypoint at `index` if it still is `id`; otherwise cancels.
    fn checked(&mut self, index: usize, id: WaypointId, store: &dyn WaypointStore) -> Option<Waypoint> {
        match store.get(index) {
            Some(wp) if wp.id == id => Some(*wp),
            _ => {
                log::debug!("Stale waypoint selection {index} ({id:?}); cancelling");
                if matches!(self.mode, InteractionMode::MoveWaypoint { .. }) {
                    self.mode = InteractionMode::default();
                }
                None
            }
        }
    }
}
