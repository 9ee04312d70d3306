//! Trail storage with per-row locking.
//!
//! Each trail sits behind its own mutex so the validation state machine can
//! hold the row for an entire check-and-write while other trails stay
//! available. Reads hand out snapshots, never references into the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use geo::MultiLineString;

use crate::error::{RegistryError, Result};
use crate::model::{Trail, TrailStatus};

/// Storage for trail records.
#[derive(Debug, Default)]
pub struct TrailStore {
    trails: RwLock<HashMap<String, Arc<Mutex<Trail>>>>,
}

impl TrailStore {
    /// Create a new empty trail store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a trail, replacing any previous trail with the same id.
    pub fn insert(&self, trail: Trail) {
        self.trails
            .write()
            .unwrap()
            .insert(trail.id.clone(), Arc::new(Mutex::new(trail)));
    }

    /// Remove a trail by id.
    pub fn remove(&self, id: &str) -> bool {
        self.trails.write().unwrap().remove(id).is_some()
    }

    /// Row handle for lock-holding operations (the state machine).
    pub fn row(&self, id: &str) -> Option<Arc<Mutex<Trail>>> {
        self.trails.read().unwrap().get(id).cloned()
    }

    /// Clone of the current trail state.
    pub fn snapshot(&self, id: &str) -> Option<Trail> {
        self.row(id).map(|row| row.lock().unwrap().clone())
    }

    /// Current status of a trail.
    pub fn status_of(&self, id: &str) -> Option<TrailStatus> {
        self.row(id).map(|row| row.lock().unwrap().status)
    }

    /// Run a closure against the locked trail row.
    pub fn with_trail<T>(&self, id: &str, f: impl FnOnce(&mut Trail) -> T) -> Result<T> {
        let row = self.row(id).ok_or_else(|| RegistryError::UnknownEntity {
            entity_id: id.to_string(),
        })?;
        let mut trail = row.lock().unwrap();
        Ok(f(&mut trail))
    }

    /// Replace the canonical geometry variant.
    pub fn set_canonical_geometry(
        &self,
        id: &str,
        geometry: Option<MultiLineString<f64>>,
    ) -> Result<()> {
        self.with_trail(id, |trail| trail.canonical_geometry = geometry)
    }

    /// Replace the raw comparison upload.
    pub fn set_raw_geometry(&self, id: &str, geometry: Option<MultiLineString<f64>>) -> Result<()> {
        self.with_trail(id, |trail| trail.raw_geometry = geometry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.trails.read().unwrap().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.trails.read().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.trails.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.read().unwrap().is_empty()
    }
}
