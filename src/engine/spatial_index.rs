//! Spatial indexing for candidate prefiltering.
//!
//! R-trees over bounding boxes — one per unit level, one per feature kind —
//! keep the computers from comparing every entity against every polygon.
//! Dirty tracking defers rebuilds until the next query.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::Bounds;
use crate::model::{FeatureKind, TerritoryGeometry, UnitKind};

use super::feature_store::FeatureStore;
use super::unit_store::UnitStore;

/// Entity bounds wrapper for R-tree indexing.
#[derive(Debug, Clone)]
pub struct IndexedBounds {
    pub entity_id: String,
    pub bounds: Bounds,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// R-tree index over territorial units and point features.
#[derive(Debug)]
pub struct TerritorySpatialIndex {
    units: HashMap<UnitKind, RTree<IndexedBounds>>,
    features: HashMap<FeatureKind, RTree<IndexedBounds>>,
    dirty: bool,
}

impl Default for TerritorySpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TerritorySpatialIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            features: HashMap::new(),
            dirty: true,
        }
    }

    /// Mark the index as needing rebuild.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.units.clear();
        self.features.clear();
        self.dirty = true;
    }

    /// Rebuild all trees from the stores.
    pub fn rebuild(&mut self, units: &UnitStore, features: &FeatureStore) {
        self.units.clear();
        for kind in UnitKind::ALL {
            let bounds: Vec<IndexedBounds> = units
                .by_kind(kind)
                .filter_map(|unit| {
                    let geometry = TerritoryGeometry::Polygon(unit.geometry.clone());
                    Bounds::of_geometry(&geometry).map(|b| IndexedBounds {
                        entity_id: unit.id.clone(),
                        bounds: b,
                    })
                })
                .collect();
            self.units.insert(kind, RTree::bulk_load(bounds));
        }

        self.features.clear();
        for kind in [FeatureKind::Hut, FeatureKind::Spring, FeatureKind::Poi] {
            let bounds: Vec<IndexedBounds> = features
                .by_kind(kind)
                .filter_map(|feature| {
                    let geometry = TerritoryGeometry::Point(feature.geometry);
                    Bounds::of_geometry(&geometry).map(|b| IndexedBounds {
                        entity_id: feature.id.clone(),
                        bounds: b,
                    })
                })
                .collect();
            self.features.insert(kind, RTree::bulk_load(bounds));
        }

        self.dirty = false;
    }

    /// Ensure the index reflects the stores.
    pub fn ensure_built(&mut self, units: &UnitStore, features: &FeatureStore) {
        if self.dirty {
            self.rebuild(units, features);
        }
    }

    /// Units of one level whose bounds intersect the query bounds.
    pub fn candidate_units(&self, level: UnitKind, bounds: &Bounds) -> Vec<String> {
        self.query(self.units.get(&level), bounds)
    }

    /// Features of one kind within a metric buffer of the query bounds.
    pub fn candidate_features(
        &self,
        kind: FeatureKind,
        bounds: &Bounds,
        buffer_m: f64,
    ) -> Vec<String> {
        let grown = bounds.expanded_by_meters(buffer_m);
        self.query(self.features.get(&kind), &grown)
    }

    fn query(&self, tree: Option<&RTree<IndexedBounds>>, bounds: &Bounds) -> Vec<String> {
        let Some(tree) = tree else {
            return Vec::new();
        };
        let envelope = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );
        tree.locate_in_envelope_intersecting(&envelope)
            .map(|b| b.entity_id.clone())
            .collect()
    }
}
