//! # Registry Engine
//!
//! Composed entry point over focused subcomponents:
//! - `UnitStore` - administrative hierarchy CRUD and traversal
//! - `TrailStore` - trail rows behind per-row locks
//! - `FeatureStore` - point features by kind
//! - `TerritorySpatialIndex` - R-trees for candidate prefiltering
//!
//! The engine wires geometry changes to the computers, the computers to the
//! association ledger, and exposes the state machine, the authorization
//! resolver and the completion-ratio aggregation over the shared ledger.

pub mod feature_store;
pub mod spatial_index;
pub mod trail_store;
pub mod unit_store;

pub use feature_store::FeatureStore;
pub use spatial_index::{IndexedBounds, TerritorySpatialIndex};
pub use trail_store::TrailStore;
pub use unit_store::UnitStore;

use geo::MultiLineString;
use log::warn;

use crate::authorize::AuthorizationResolver;
use crate::error::{RegistryError, Result};
use crate::geo_utils::Bounds;
use crate::intersect::compute_territory_links;
use crate::ledger::{LinkLedger, MemoryLedger, ProximityLink, ProximityScope, TerritoryLink};
use crate::model::{
    Actor, HasTerritoryGeometry, PointFeature, TerritorialUnit, TerritoryGeometry, Trail, UnitKind,
};
use crate::progress::{self, SalRatio};
use crate::proximity::compute_proximity_links;
use crate::sync::{SyncRecord, Syncable};
use crate::validation::{CorridorChecker, ValidationOutcome, ValidationStateMachine};
use crate::ComputeConfig;

/// Outcome counters of a batch recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub refreshed: usize,
    pub failed: usize,
}

/// Entity/link counts snapshot for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub unit_count: usize,
    pub trail_count: usize,
    pub feature_count: usize,
}

/// The registry engine.
///
/// Owns the stores, the in-memory association ledger and the computation
/// configuration. Spatial recomputation is eager per entity: every geometry
/// change replaces that entity's association sets before returning, so a
/// background task queue can treat one call as one unit of work.
pub struct RegistryEngine {
    units: UnitStore,
    trails: TrailStore,
    features: FeatureStore,
    ledger: MemoryLedger,
    spatial: TerritorySpatialIndex,
    config: ComputeConfig,
}

impl Default for RegistryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(ComputeConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: ComputeConfig) -> Self {
        Self {
            units: UnitStore::new(),
            trails: TrailStore::new(),
            features: FeatureStore::new(),
            ledger: MemoryLedger::new(),
            spatial: TerritorySpatialIndex::new(),
            config,
        }
    }

    /// The association ledger, for direct link reads and event sink
    /// registration.
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn units(&self) -> &UnitStore {
        &self.units
    }

    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }

    pub fn features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Add a territorial unit from administrative import.
    ///
    /// Existing association links are not recomputed automatically; run
    /// [`RegistryEngine::refresh_all_links`] after a hierarchy import.
    pub fn add_unit(&mut self, unit: TerritorialUnit) {
        self.units.add(unit);
        self.spatial.mark_dirty();
    }

    /// Add a trail and compute its association links.
    pub fn add_trail(&mut self, trail: Trail) -> Result<()> {
        let id = trail.id.clone();
        self.trails.insert(trail);
        self.refresh_entity_links(&id)
    }

    /// Add a point feature and compute its territory links.
    pub fn add_feature(&mut self, feature: PointFeature) -> Result<()> {
        let id = feature.id.clone();
        self.features.add(feature);
        self.spatial.mark_dirty();
        self.refresh_entity_links(&id)
    }

    /// Replace a trail's canonical geometry and recompute its links.
    pub fn set_trail_canonical_geometry(
        &mut self,
        trail_id: &str,
        geometry: Option<MultiLineString<f64>>,
    ) -> Result<()> {
        self.trails.set_canonical_geometry(trail_id, geometry)?;
        self.refresh_entity_links(trail_id)
    }

    /// Store a raw comparison upload for later validation.
    ///
    /// Raw uploads never drive territorial assignment, so no recomputation
    /// happens here.
    pub fn set_trail_raw_geometry(
        &mut self,
        trail_id: &str,
        geometry: Option<MultiLineString<f64>>,
    ) -> Result<()> {
        self.trails.set_raw_geometry(trail_id, geometry)
    }

    /// Apply one record of the external sync feed to a trail, recomputing
    /// links when the territory geometry changed.
    pub fn apply_trail_sync(&mut self, record: &SyncRecord) -> Result<()> {
        let changed = self
            .trails
            .with_trail(&record.entity_id, |trail| trail.apply_sync(record))??;
        if changed {
            self.refresh_entity_links(&record.entity_id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Association recomputation
    // ========================================================================

    /// React to a geometry change: recompute every association scope of the
    /// entity and replace them in the ledger.
    ///
    /// An absent geometry clears the entity's links. A computation failure
    /// aborts before any ledger write, leaving the prior sets intact.
    pub fn refresh_entity_links(&mut self, entity_id: &str) -> Result<()> {
        self.spatial.ensure_built(&self.units, &self.features);
        self.refresh_links_inner(entity_id)
    }

    /// Recompute association links for all trails and features.
    ///
    /// Entities are independent; with the `parallel` feature they are
    /// processed on the rayon pool (per-entity writes stay serialized by
    /// the ledger). Failures are logged and counted, never fatal for the
    /// batch.
    pub fn refresh_all_links(&mut self) -> RefreshStats {
        self.spatial.ensure_built(&self.units, &self.features);

        let mut ids = self.trails.ids();
        ids.extend(self.features.ids().cloned());

        let engine: &Self = self;
        let results: Vec<(String, Result<()>)>;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            results = ids
                .into_par_iter()
                .map(|id| {
                    let outcome = engine.refresh_links_inner(&id);
                    (id, outcome)
                })
                .collect();
        }

        #[cfg(not(feature = "parallel"))]
        {
            results = ids
                .into_iter()
                .map(|id| {
                    let outcome = engine.refresh_links_inner(&id);
                    (id, outcome)
                })
                .collect();
        }

        let mut stats = RefreshStats::default();
        for (id, outcome) in results {
            match outcome {
                Ok(()) => stats.refreshed += 1,
                Err(e) => {
                    warn!("link recomputation failed for '{}': {}", id, e);
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Recompute one entity against an already-built spatial index.
    ///
    /// All scopes are computed before the first ledger write, so a failing
    /// computation never leaves a partially refreshed entity.
    fn refresh_links_inner(&self, entity_id: &str) -> Result<()> {
        let geometry = self.entity_geometry(entity_id)?;
        let bounds = geometry.as_ref().and_then(Bounds::of_geometry);

        let mut territory_batches: Vec<(UnitKind, Vec<TerritoryLink>)> = Vec::new();
        for level in UnitKind::ALL {
            let links = match (&geometry, &bounds) {
                (Some(geometry), Some(bounds)) => {
                    let candidate_ids = self.spatial.candidate_units(level, bounds);
                    let candidates = candidate_ids.iter().filter_map(|id| self.units.get(id));
                    compute_territory_links(entity_id, Some(geometry), candidates, &self.config)?
                }
                _ => Vec::new(),
            };
            territory_batches.push((level, links));
        }

        let mut proximity_batches: Vec<(ProximityScope, Vec<ProximityLink>)> = Vec::new();
        if self.trails.contains(entity_id) {
            for rule in &self.config.proximity_rules {
                let scope = ProximityScope::new(rule.target, rule.radius_m);
                let links = match (&geometry, &bounds) {
                    (Some(geometry), Some(bounds)) => {
                        let candidate_ids = self.spatial.candidate_features(
                            rule.target,
                            bounds,
                            f64::from(rule.radius_m),
                        );
                        let targets: Vec<(String, TerritoryGeometry)> = candidate_ids
                            .iter()
                            .filter_map(|id| self.features.get(id))
                            .map(|f| (f.id.clone(), TerritoryGeometry::Point(f.geometry)))
                            .collect();
                        compute_proximity_links(
                            entity_id,
                            Some(geometry),
                            targets.iter().map(|(id, g)| (id.as_str(), g)),
                            rule.radius_m,
                        )?
                    }
                    _ => Vec::new(),
                };
                proximity_batches.push((scope, links));
            }
        }

        for (level, links) in territory_batches {
            self.ledger.replace_territory_links(entity_id, level, links)?;
        }
        for (scope, links) in proximity_batches {
            self.ledger.replace_proximity_links(entity_id, scope, links)?;
        }
        Ok(())
    }

    fn entity_geometry(&self, entity_id: &str) -> Result<Option<TerritoryGeometry>> {
        if let Some(trail) = self.trails.snapshot(entity_id) {
            return Ok(trail.territory_geometry());
        }
        if let Some(feature) = self.features.get(entity_id) {
            return Ok(feature.territory_geometry());
        }
        Err(RegistryError::UnknownEntity {
            entity_id: entity_id.to_string(),
        })
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Promote a trail from ready-for-validation to validated.
    ///
    /// The trail row stays locked for the whole check-and-write.
    pub fn validate_trail(
        &self,
        trail_id: &str,
        actor: &Actor,
        now: i64,
    ) -> Result<ValidationOutcome> {
        let row = self
            .trails
            .row(trail_id)
            .ok_or_else(|| RegistryError::UnknownEntity {
                entity_id: trail_id.to_string(),
            })?;
        let mut trail = row.lock().unwrap();
        let checker = CorridorChecker::new(self.config.geometry_tolerance_m);
        ValidationStateMachine::new(&self.ledger, &checker).validate(&mut trail, actor, now)
    }

    /// Demote a validated trail back to ready-for-validation.
    pub fn revert_trail_validation(
        &self,
        trail_id: &str,
        actor: &Actor,
    ) -> Result<ValidationOutcome> {
        let row = self
            .trails
            .row(trail_id)
            .ok_or_else(|| RegistryError::UnknownEntity {
                entity_id: trail_id.to_string(),
            })?;
        let mut trail = row.lock().unwrap();
        let checker = CorridorChecker::new(self.config.geometry_tolerance_m);
        ValidationStateMachine::new(&self.ledger, &checker).revert_validation(&mut trail, actor)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the actor may manage the entity.
    pub fn can_manage(&self, actor: &Actor, entity_id: &str) -> Result<bool> {
        AuthorizationResolver::new(&self.ledger).can_manage(actor, entity_id)
    }

    /// Completion ratio of a territorial unit, derived at read time.
    pub fn completion_ratio(&self, unit_id: &str) -> Result<SalRatio> {
        let unit = self
            .units
            .get(unit_id)
            .ok_or_else(|| RegistryError::UnknownUnit {
                unit_id: unit_id.to_string(),
            })?;
        let descendants = self.units.descendants(unit_id);
        progress::completion_ratio(&self.ledger, unit, &descendants, |id| {
            self.trails.status_of(id)
        })
    }

    /// Entity counts snapshot.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            unit_count: self.units.len(),
            trail_count: self.trails.len(),
            feature_count: self.features.len(),
        }
    }
}
