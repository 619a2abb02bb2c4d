//! The live scene: one owned subgraph per visual feature.
//!
//! Nodes live in a fixed arena addressed by [`FeatureKey`]. Each slot carries
//! its own visibility flag; a hidden feature is never part of the active
//! scene even if its geometry is still cached. Geometry is kept in `f64`
//! render-space (ENU) coordinates and only narrowed to `f32` at GPU upload.

pub mod imagery;
pub mod models;
pub mod sensor;
pub mod shapes;

use self::imagery::TileQuad;
use glam::{DMat4, DVec3};

/// Stable address of a feature subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    Grid,
    Trail,
    Imagery,
    Vehicle,
    Target,
    Waypoints,
    SensorCloud,
}

impl FeatureKey {
    /// Draw order: ground layers first.
    pub const ALL: [FeatureKey; 7] = [
        FeatureKey::Imagery,
        FeatureKey::Grid,
        FeatureKey::Trail,
        FeatureKey::Waypoints,
        FeatureKey::Target,
        FeatureKey::SensorCloud,
        FeatureKey::Vehicle,
    ];

    fn slot(self) -> usize {
        match self {
            FeatureKey::Imagery => 0,
            FeatureKey::Grid => 1,
            FeatureKey::Trail => 2,
            FeatureKey::Waypoints => 3,
            FeatureKey::Target => 4,
            FeatureKey::SensorCloud => 5,
            FeatureKey::Vehicle => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Lines,
    LineStrip,
    Points,
}

/// RGBA, linear 0..1.
pub type Color = [f32; 4];

/// A batch of vertices in node-local coordinates with per-vertex colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub primitive: Primitive,
    pub vertices: Vec<DVec3>,
    pub colors: Vec<Color>,
}

impl Geometry {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            vertices: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// All vertices share one color.
    pub fn uniform(primitive: Primitive, vertices: Vec<DVec3>, color: Color) -> Self {
        let colors = vec![color; vertices.len()];
        Self {
            primitive,
            vertices,
            colors,
        }
    }

    pub fn push(&mut self, vertex: DVec3, color: Color) {
        self.vertices.push(vertex);
        self.colors.push(color);
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// One feature's renderable subgraph.
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    /// Node-local to render space.
    pub transform: DMat4,
    pub parts: Vec<Geometry>,
    /// Textured ground quads (imagery only).
    pub tiles: Vec<TileQuad>,
    /// Bumped whenever the geometry is replaced; GPU caches key on it.
    pub generation: u64,
}

impl SceneNode {
    pub fn new(parts: Vec<Geometry>) -> Self {
        Self {
            transform: DMat4::IDENTITY,
            parts,
            tiles: Vec::new(),
            generation: 0,
        }
    }

    pub fn with_transform(mut self, transform: DMat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|g| g.vertices.len()).sum()
    }
}

#[derive(Debug, Default)]
struct Slot {
    node: Option<SceneNode>,
    visible: bool,
}

/// Arena of feature subgraphs.
#[derive(Debug, Default)]
pub struct SceneNodeSet {
    slots: [Slot; 7],
    generation: u64,
}

impl SceneNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, key: FeatureKey) -> bool {
        self.slots[key.slot()].visible
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_visible(&mut self, key: FeatureKey, visible: bool) -> bool {
        let slot = &mut self.slots[key.slot()];
        if slot.visible == visible {
            return false;
        }
        slot.visible = visible;
        log::debug!(
            "{:?} {}",
            key,
            if visible { "attached" } else { "detached" }
        );
        true
    }

    /// Part of the active scene: visible and built.
    pub fn is_attached(&self, key: FeatureKey) -> bool {
        let slot = &self.slots[key.slot()];
        slot.visible && slot.node.is_some()
    }

    /// The built subgraph, attached or not.
    pub fn node(&self, key: FeatureKey) -> Option<&SceneNode> {
        self.slots[key.slot()].node.as_ref()
    }

    /// Active subgraphs in draw order.
    pub fn attached(&self) -> impl Iterator<Item = (FeatureKey, &SceneNode)> + '_ {
        FeatureKey::ALL.into_iter().filter_map(move |key| {
            let slot = &self.slots[key.slot()];
            match (&slot.node, slot.visible) {
                (Some(node), true) => Some((key, node)),
                _ => None,
            }
        })
    }

    /// Swaps in new geometry (or removes it with `None`).
    pub fn replace(&mut self, key: FeatureKey, node: Option<SceneNode>) {
        let slot = &mut self.slots[key.slot()];
        slot.node = node.map(|mut n| {
            self.generation += 1;
            n.generation = self.generation;
            n
        });
    }

    /// Moves a node without touching its geometry.
    pub fn set_transform(&mut self, key: FeatureKey, transform: DMat4) {
        if let Some(node) = self.slots[key.slot()].node.as_mut() {
            node.transform = transform;
        }
    }

    pub fn clear(&mut self, key: FeatureKey) {
        self.replace(key, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_node() -> SceneNode {
        SceneNode::new(vec![Geometry::uniform(
            Primitive::Lines,
            vec![DVec3::ZERO, DVec3::X],
            shapes::WHITE,
        )])
    }

    #[test]
    fn hidden_feature_is_detached() {
        let mut scene = SceneNodeSet::new();
        scene.replace(FeatureKey::Trail, Some(line_node()));
        assert!(!scene.is_attached(FeatureKey::Trail));
        assert_eq!(scene.attached().count(), 0);

        scene.set_visible(FeatureKey::Trail, true);
        assert!(scene.is_attached(FeatureKey::Trail));

        scene.set_visible(FeatureKey::Trail, false);
        assert!(!scene.is_attached(FeatureKey::Trail));
        assert!(scene.node(FeatureKey::Trail).is_some());
    }

    #[test]
    fn toggle_round_trip_keeps_subgraph() {
        let mut scene = SceneNodeSet::new();
        scene.set_visible(FeatureKey::Grid, true);
        scene.replace(FeatureKey::Grid, Some(line_node()));
        let before = scene.node(FeatureKey::Grid).cloned().unwrap();

        scene.set_visible(FeatureKey::Grid, false);
        scene.set_visible(FeatureKey::Grid, true);
        let after = scene.node(FeatureKey::Grid).unwrap();
        assert_eq!(after.parts, before.parts);
        assert_eq!(after.generation, before.generation);
    }

    #[test]
    fn replace_bumps_generation_transform_does_not() {
        let mut scene = SceneNodeSet::new();
        scene.replace(FeatureKey::Vehicle, Some(line_node()));
        let g1 = scene.node(FeatureKey::Vehicle).unwrap().generation;

        scene.set_transform(FeatureKey::Vehicle, DMat4::from_translation(DVec3::Z));
        assert_eq!(scene.node(FeatureKey::Vehicle).unwrap().generation, g1);

        scene.replace(FeatureKey::Vehicle, Some(line_node()));
        assert!(scene.node(FeatureKey::Vehicle).unwrap().generation > g1);
    }

    #[test]
    fn attached_follows_draw_order() {
        let mut scene = SceneNodeSet::new();
        for key in [FeatureKey::Vehicle, FeatureKey::Grid, FeatureKey::Trail] {
            scene.set_visible(key, true);
            scene.replace(key, Some(line_node()));
        }
        let keys: Vec<_> = scene.attached().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![FeatureKey::Grid, FeatureKey::Trail, FeatureKey::Vehicle]
        );
    }
}
