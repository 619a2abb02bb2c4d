//! The ordered waypoint collection and the store interface it sits behind.

use crate::pose::ReferenceFrame;
use glam::DVec3;
use thiserror::Error;

/// Identity of a waypoint, stable while the session lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    /// NED meters for `LocalNed`; `(lat_deg, lon_deg, alt_m)` for `Global`.
    pub position: DVec3,
    pub frame: ReferenceFrame,
}

impl Waypoint {
    /// Altitude in meters, up positive.
    pub fn altitude(&self) -> f64 {
        match self.frame {
            ReferenceFrame::LocalNed => -self.position.z,
            ReferenceFrame::Global => self.position.z,
        }
    }

    pub fn set_altitude(&mut self, altitude_m: f64) {
        self.position.z = match self.frame {
            ReferenceFrame::LocalNed => -altitude_m,
            ReferenceFrame::Global => altitude_m,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaypointError {
    #[error("waypoint index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Authoritative waypoint list. The scene only ever reads it; every
/// mutation bumps [`WaypointStore::revision`] so views can resynchronise.
pub trait WaypointStore {
    fn waypoints(&self) -> &[Waypoint];

    fn revision(&self) -> u64;

    /// Appends a waypoint and returns its identity.
    fn insert(&mut self, position: DVec3, frame: ReferenceFrame) -> WaypointId;

    fn set_position(&mut self, index: usize, position: DVec3) -> Result<(), WaypointError>;

    fn set_altitude(&mut self, index: usize, altitude_m: f64) -> Result<(), WaypointError>;

    fn remove(&mut self, index: usize) -> Result<Waypoint, WaypointError>;

    /// Removes every waypoint at once.
    fn clear(&mut self);

    fn len(&self) -> usize {
        self.waypoints().len()
    }

    fn is_empty(&self) -> bool {
        self.waypoints().is_empty()
    }

    fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints().get(index)
    }
}

/// In-memory store used when no external waypoint manager is attached.
#[derive(Debug, Clone, Default)]
pub struct WaypointList {
    items: Vec<Waypoint>,
    next_id: u32,
    revision: u64,
}

impl WaypointList {
    pub fn new() -> Self {
        Self::default()
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut Waypoint, WaypointError> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(WaypointError::IndexOutOfRange { index, len })
    }
}

impl WaypointStore for WaypointList {
    fn waypoints(&self) -> &[Waypoint] {
        &self.items
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn insert(&mut self, position: DVec3, frame: ReferenceFrame) -> WaypointId {
        let id = WaypointId(self.next_id);
        self.next_id += 1;
        self.items.push(Waypoint {
            id,
            position,
            frame,
        });
        self.revision += 1;
        id
    }

    fn set_position(&mut self, index: usize, position: DVec3) -> Result<(), WaypointError> {
        self.item_mut(index)?.position = position;
        self.revision += 1;
        Ok(())
    }

    fn set_altitude(&mut self, index: usize, altitude_m: f64) -> Result<(), WaypointError> {
        self.item_mut(index)?.set_altitude(altitude_m);
        self.revision += 1;
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<Waypoint, WaypointError> {
        if index >= self.items.len() {
            return Err(WaypointError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        self.revision += 1;
        Ok(removed)
    }

    fn clear(&mut self) {
        self.items.clear();
        self.revision += 1;
    }
}
