//! Georeferenced map imagery draped on the ground plane.
//!
//! Tiles are square and aligned with the UTM grid of the georeference zone.
//! A tile at level `L` covers `TILE_PX` pixels of `min_resolution * 2^L`
//! meters each, so column/row indices are simply `floor(easting / size)` and
//! `floor(northing / size)`.

use super::SceneNode;
use crate::frames::CoordinateTransformer;
use geodesy::UtmZone;
use glam::DVec3;
use std::collections::HashMap;
use std::sync::Arc;

pub const TILE_PX: u32 = 256;
pub const MAX_TILES: usize = 64;
const MAX_LEVEL: u8 = 24;
/// Images kept across refreshes before the cache is flushed.
const IMAGE_CACHE_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Index of the source in the imagery catalog.
    pub source: usize,
    pub zone: UtmZone,
    pub level: u8,
    pub col: i64,
    pub row: i64,
}

impl TileKey {
    /// South-west corner and edge length of the tile, UTM meters.
    pub fn bounds(&self, min_resolution_m: f64) -> (f64, f64, f64) {
        let size = tile_size_m(min_resolution_m, self.level);
        (self.col as f64 * size, self.row as f64 * size, size)
    }
}

/// RGBA8 pixels, rows north to south.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A provider of map tiles.
pub trait ImagerySource: Send {
    fn name(&self) -> &str;

    /// Ground resolution of level 0, meters per pixel.
    fn min_resolution_m(&self) -> f64;

    /// Street maps get the light HUD theme.
    fn street_map(&self) -> bool {
        false
    }

    fn fetch(&self, key: &TileKey) -> Option<TileImage>;
}

/// Selectable imagery sources, addressed by index.
#[derive(Default)]
pub struct ImageryCatalog {
    sources: Vec<Box<dyn ImagerySource>>,
}

impl ImageryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Box<dyn ImagerySource>) -> usize {
        self.sources.push(source);
        self.sources.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&dyn ImagerySource> {
        self.sources.get(index).map(|s| s.as_ref())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sources
            .iter()
            .position(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sources.iter().map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// One textured ground quad in render space.
#[derive(Debug, Clone)]
pub struct TileQuad {
    pub key: TileKey,
    /// South-west, south-east, north-east, north-west.
    pub corners: [DVec3; 4],
    pub image: Arc<TileImage>,
}

#[inline]
pub fn tile_size_m(min_resolution_m: f64, level: u8) -> f64 {
    min_resolution_m * (1u64 << level) as f64 * TILE_PX as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    pub level: u8,
    pub radius_m: f64,
    pub keys: Vec<TileKey>,
}

/// Chooses the level and the tiles covering a square of half-size
/// `max(10 * distance, 100)` around `(easting, northing)`.
pub fn plan_tiles(
    source: usize,
    zone: UtmZone,
    easting: f64,
    northing: f64,
    min_resolution_m: f64,
    camera_distance_m: f64,
) -> TilePlan {
    let wanted_res = camera_distance_m / 50.0;
    let mut level = 0u8;
    while level < MAX_LEVEL && min_resolution_m * ((1u64 << level) as f64) < wanted_res {
        level += 1;
    }
    let radius_m = (10.0 * camera_distance_m).max(100.0);

    let span = |level: u8| {
        let size = tile_size_m(min_resolution_m, level);
        let c0 = ((easting - radius_m) / size).floor() as i64;
        let c1 = ((easting + radius_m) / size).floor() as i64;
        let r0 = ((northing - radius_m) / size).floor() as i64;
        let r1 = ((northing + radius_m) / size).floor() as i64;
        (c0, c1, r0, r1)
    };

    let (mut c0, mut c1, mut r0, mut r1) = span(level);
    while level < MAX_LEVEL && ((c1 - c0 + 1) * (r1 - r0 + 1)) as usize > MAX_TILES {
        level += 1;
        (c0, c1, r0, r1) = span(level);
    }

    let mut keys = Vec::with_capacity(((c1 - c0 + 1) * (r1 - r0 + 1)) as usize);
    for row in r0..=r1 {
        for col in c0..=c1 {
            keys.push(TileKey {
                source,
                zone,
                level,
                col,
                row,
            });
        }
    }

    TilePlan {
        level,
        radius_m,
        keys,
    }
}

/// What the imagery subgraph should become this frame.
#[derive(Debug)]
pub enum ImageryUpdate {
    Keep,
    Replace(SceneNode),
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    source: usize,
    zone: UtmZone,
    easting: f64,
    northing: f64,
    level: u8,
    radius_m: f64,
}

/// Tracks which tile set is on screen and decides when to rebuild it.
#[derive(Default)]
pub struct ImageryLayer {
    selection: Option<usize>,
    anchor: Option<Anchor>,
    images: HashMap<TileKey, Arc<TileImage>>,
}

impl ImageryLayer {
    pub fn new(selection: Option<usize>) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Returns `true` when the selection changed.
    pub fn select(&mut self, selection: Option<usize>) -> bool {
        if self.selection == selection {
            return false;
        }
        self.selection = selection;
        self.anchor = None;
        true
    }

    /// Forces a rebuild on the next update.
    pub fn invalidate(&mut self) {
        self.anchor = None;
    }

    /// Recomputes the tile set when the source, zone or level changed, or
    /// the vehicle moved more than a quarter of the viewing radius.
    pub fn update(
        &mut self,
        catalog: &ImageryCatalog,
        transformer: &CoordinateTransformer,
        vehicle_ned: DVec3,
        camera_distance_m: f64,
    ) -> ImageryUpdate {
        let Some((index, source)) = self
            .selection
            .and_then(|i| catalog.get(i).map(|s| (i, s)))
        else {
            return self.drop_anchor();
        };
        let Ok(center) = transformer.local_to_utm(DVec3::new(vehicle_ned.x, vehicle_ned.y, 0.0))
        else {
            return self.drop_anchor();
        };

        let min_res = source.min_resolution_m();
        let plan = plan_tiles(
            index,
            center.zone,
            center.easting,
            center.northing,
            min_res,
            camera_distance_m,
        );

        if let Some(a) = self.anchor {
            let moved = (center.easting - a.easting).hypot(center.northing - a.northing);
            if a.source == index
                && a.zone == center.zone
                && a.level == plan.level
                && moved <= a.radius_m / 4.0
            {
                return ImageryUpdate::Keep;
            }
        }

        if self.images.len() > IMAGE_CACHE_LIMIT {
            self.images.clear();
        }

        let mut node = SceneNode::default();
        for key in &plan.keys {
            let image = match self.images.get(key) {
                Some(img) => img.clone(),
                None => match source.fetch(key) {
                    Some(img) => {
                        let img = Arc::new(img);
                        self.images.insert(*key, img.clone());
                        img
                    }
                    None => continue,
                },
            };
            let (e0, n0, size) = key.bounds(min_res);
            let corners = [(e0, n0), (e0 + size, n0), (e0 + size, n0 + size), (e0, n0 + size)]
                .map(|(e, n)| transformer.utm_to_ground(e, n));
            let [Ok(sw), Ok(se), Ok(ne), Ok(nw)] = corners else {
                continue;
            };
            node.tiles.push(TileQuad {
                key: *key,
                corners: [sw, se, ne, nw].map(CoordinateTransformer::local_to_render),
                image,
            });
        }

        log::debug!(
            "Imagery '{}' level {} with {} tiles (radius {:.0} m)",
            source.name(),
            plan.level,
            node.tiles.len(),
            plan.radius_m
        );

        self.anchor = Some(Anchor {
            source: index,
            zone: center.zone,
            easting: center.easting,
            northing: center.northing,
            level: plan.level,
            radius_m: plan.radius_m,
        });
        ImageryUpdate::Replace(node)
    }

    fn drop_anchor(&mut self) -> ImageryUpdate {
        self.anchor = None;
        ImageryUpdate::Remove
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Attitude, VehicleState};
    use geodesy::Geodetic;

    struct Flat;

    impl ImagerySource for Flat {
        fn name(&self) -> &str {
            "flat"
        }

        fn min_resolution_m(&self) -> f64 {
            0.5
        }

        fn fetch(&self, _key: &TileKey) -> Option<TileImage> {
            Some(TileImage {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            })
        }
    }

    fn zone() -> UtmZone {
        UtmZone::new(32, 'T').unwrap()
    }

    fn georeferenced() -> CoordinateTransformer {
        let mut tf = CoordinateTransformer::default();
        tf.ingest(&VehicleState {
            local_ned: DVec3::ZERO,
            attitude: Attitude::default(),
            geodetic: Some(Geodetic::new(47.3977, 8.5456, 488.0)),
        });
        tf
    }

    fn catalog() -> ImageryCatalog {
        let mut c = ImageryCatalog::new();
        c.register(Box::new(Flat));
        c
    }

    #[test]
    fn level_resolution_tracks_distance() {
        // 50 m away wants 1 m/px: level 1 of a 0.5 m source.
        let plan = plan_tiles(0, zone(), 465_000.0, 5_250_000.0, 0.5, 50.0);
        assert_eq!(plan.level, 1);
        assert_eq!(plan.radius_m, 500.0);
        // 256 m tiles over a 1000 m span: 4 or 5 per axis.
        assert!(plan.keys.len() >= 16 && plan.keys.len() <= MAX_TILES);
    }

    #[test]
    fn close_camera_keeps_minimum_radius() {
        let plan = plan_tiles(0, zone(), 1000.0, 1000.0, 1.0, 2.0);
        assert_eq!(plan.level, 0);
        assert_eq!(plan.radius_m, 100.0);
    }

    #[test]
    fn tile_count_is_bounded() {
        for d in [10.0, 75.0, 333.0, 4_000.0, 90_000.0] {
            let plan = plan_tiles(0, zone(), 400_123.0, 5_123_456.0, 0.3, d);
            assert!(plan.keys.len() <= MAX_TILES, "{d}: {}", plan.keys.len());
        }
    }

    #[test]
    fn tiles_cover_the_viewing_square() {
        let (e, n) = (465_010.0, 5_250_020.0);
        let plan = plan_tiles(0, zone(), e, n, 0.5, 50.0);
        let size = tile_size_m(0.5, plan.level);
        let covers = |x: f64, y: f64| {
            plan.keys.iter().any(|k| {
                let (e0, n0, _) = k.bounds(0.5);
                x >= e0 && x < e0 + size && y >= n0 && y < n0 + size
            })
        };
        let r = plan.radius_m;
        assert!(covers(e - r, n - r));
        assert!(covers(e + r, n + r));
        assert!(covers(e, n));
    }

    #[test]
    fn absent_without_georeference() {
        let mut layer = ImageryLayer::new(Some(0));
        let tf = CoordinateTransformer::default();
        let update = layer.update(&catalog(), &tf, DVec3::ZERO, 50.0);
        assert!(matches!(update, ImageryUpdate::Remove));
    }

    #[test]
    fn absent_without_source() {
        let mut layer = ImageryLayer::new(None);
        let update = layer.update(&catalog(), &georeferenced(), DVec3::ZERO, 50.0);
        assert!(matches!(update, ImageryUpdate::Remove));
    }

    #[test]
    fn rebuilds_only_after_quarter_radius() {
        let tf = georeferenced();
        let cat = catalog();
        let mut layer = ImageryLayer::new(Some(0));

        let ImageryUpdate::Replace(node) = layer.update(&cat, &tf, DVec3::ZERO, 50.0) else {
            panic!("first update must build");
        };
        assert!(!node.tiles.is_empty());
        // Tiles are on the ground.
        assert!(node.tiles[0].corners.iter().all(|c| c.z.abs() < 1e-9));

        // Radius is 500 m: 100 m does not trigger, 130 m does.
        let near = layer.update(&cat, &tf, DVec3::new(100.0, 0.0, -20.0), 50.0);
        assert!(matches!(near, ImageryUpdate::Keep));
        let far = layer.update(&cat, &tf, DVec3::new(0.0, 130.0, -20.0), 50.0);
        assert!(matches!(far, ImageryUpdate::Replace(_)));
    }

    #[test]
    fn selection_change_forces_rebuild() {
        let tf = georeferenced();
        let mut cat = catalog();
        cat.register(Box::new(Flat));
        let mut layer = ImageryLayer::new(Some(0));
        layer.update(&cat, &tf, DVec3::ZERO, 50.0);

        assert!(layer.select(Some(1)));
        assert!(!layer.select(Some(1)));
        let update = layer.update(&cat, &tf, DVec3::ZERO, 50.0);
        assert!(matches!(update, ImageryUpdate::Replace(_)));
    }
}
