//! Point feature storage.

use std::collections::HashMap;

use crate::model::{FeatureKind, PointFeature};

/// Storage for huts, springs and generic points of interest.
#[derive(Debug, Default)]
pub struct FeatureStore {
    features: HashMap<String, PointFeature>,
}

impl FeatureStore {
    /// Create a new empty feature store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature, replacing any previous feature with the same id.
    pub fn add(&mut self, feature: PointFeature) {
        self.features.insert(feature.id.clone(), feature);
    }

    /// Remove a feature by id.
    pub fn remove(&mut self, id: &str) -> Option<PointFeature> {
        self.features.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&PointFeature> {
        self.features.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.features.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.features.keys()
    }

    /// All features of one kind.
    pub fn by_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &PointFeature> {
        self.features.values().filter(move |f| f.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
