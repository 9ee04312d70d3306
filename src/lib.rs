//! # Trailnet
//!
//! Territorial registry core for a national hiking-trail network.
//!
//! This library provides:
//! - Weighted territorial assignment (overlap fractions against the
//!   region → province → area → sector hierarchy)
//! - Buffered proximity matching (ellipsoidal distance, inclusive radius)
//! - An association ledger with atomic replace-per-scope semantics and
//!   post-write domain events
//! - The guarded validation state machine for the 3⇄4 status edge
//! - Read-time completion-ratio ("SAL") aggregation over the hierarchy
//! - Territorial authorization resolution per actor role
//!
//! ## Features
//!
//! - **`parallel`** - Batch link recomputation on the rayon pool
//! - **`persistence`** - SQLite-backed association ledger
//!
//! ## Quick Start
//!
//! ```rust
//! use geo::{polygon, LineString, MultiLineString, MultiPolygon};
//! use trailnet::{RegistryEngine, TerritorialUnit, Trail, TrailStatus, UnitKind};
//!
//! let mut engine = RegistryEngine::new();
//! engine.add_unit(TerritorialUnit {
//!     id: "sector-1".to_string(),
//!     code: "S1".to_string(),
//!     name: "Sector One".to_string(),
//!     kind: UnitKind::Sector,
//!     geometry: MultiPolygon::new(vec![polygon![
//!         (x: 0.0, y: 0.0),
//!         (x: 0.1, y: 0.0),
//!         (x: 0.1, y: 0.1),
//!         (x: 0.0, y: 0.1),
//!     ]]),
//!     expected_trail_count: 1,
//!     parent_id: None,
//! });
//!
//! let line = MultiLineString::new(vec![LineString::from(vec![
//!     (0.01, 0.05),
//!     (0.09, 0.05),
//! ])]);
//! let trail = Trail::new("trail-1")
//!     .with_status(TrailStatus::ReadyForValidation)
//!     .with_canonical_geometry(line);
//! engine.add_trail(trail).unwrap();
//!
//! let ratio = engine.completion_ratio("sector-1").unwrap();
//! assert!(ratio.display() > 0.99);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{RegistryError, Result};

// Core data model
pub mod model;
pub use model::{
    Actor, FeatureKind, HasTerritoryGeometry, PointFeature, SyncPayload, TerritorialRole,
    TerritorialUnit, TerritoryGeometry, Trail, TrailProperties, TrailStatus, UnitKind,
};

// Geographic utilities (distance, bounds, buffer conversions)
pub mod geo_utils;
pub use geo_utils::Bounds;

// Weighted overlap against territorial polygons
pub mod intersect;
pub use intersect::compute_territory_links;

// Buffered proximity matching
pub mod proximity;
pub use proximity::{compute_proximity_links, within_buffer};

// Association ledger with atomic replace and domain events
pub mod ledger;
pub use ledger::{
    EventSink, LedgerEvent, LinkLedger, MemoryLedger, ProximityLink, ProximityScope,
    RecordingSink, TerritoryLink,
};

// Territorial authorization
pub mod authorize;
pub use authorize::AuthorizationResolver;

// Validation state machine for the 3⇄4 edge
pub mod validation;
pub use validation::{
    CorridorChecker, GeometryChecker, ValidationOutcome, ValidationRejection,
    ValidationStateMachine,
};

// Completion-ratio aggregation
pub mod progress;
pub use progress::SalRatio;

// External synchronization import (WKT ingest, status levels 0-2)
pub mod sync;
pub use sync::{parse_wkt_geometry, to_wkt_string, SyncRecord, Syncable};

// Composed registry engine with extracted store components
pub mod engine;
pub use engine::{
    FeatureStore, RegistryEngine, RegistryStats, RefreshStats, TerritorySpatialIndex, TrailStore,
    UnitStore,
};

// SQLite-backed association ledger
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteLedger;

// ============================================================================
// Configuration
// ============================================================================

/// One proximity computation the engine runs per trail geometry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityRule {
    pub target: FeatureKind,
    pub radius_m: u32,
}

/// Configuration for the computation engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Minimum overlap fraction kept as a territory link. Fractions below
    /// this are boundary-touching noise. Default: 1e-4
    pub min_link_fraction: f64,

    /// Tolerance for the validation comparison of a raw upload against the
    /// canonical line, in meters. Accounts for GPS variance of 5-10 m.
    /// Default: 30.0
    pub geometry_tolerance_m: f64,

    /// Proximity scopes recomputed on every trail geometry change.
    /// Default: huts at 250 m, springs and generic POIs at 100 m.
    pub proximity_rules: Vec<ProximityRule>,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            min_link_fraction: 1e-4,
            geometry_tolerance_m: 30.0,
            proximity_rules: vec![
                ProximityRule {
                    target: FeatureKind::Hut,
                    radius_m: 250,
                },
                ProximityRule {
                    target: FeatureKind::Spring,
                    radius_m: 100,
                },
                ProximityRule {
                    target: FeatureKind::Poi,
                    radius_m: 100,
                },
            ],
        }
    }
}
