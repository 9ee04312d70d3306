//! Core data model: territorial hierarchy, trails, point features, actors.
//!
//! Every attribute the computation engines and the validation state machine
//! read is a typed field with a named accessor; there are no dynamically
//! keyed property bags.

use geo::{Geometry, MultiLineString, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

// ============================================================================
// Territorial hierarchy
// ============================================================================

/// Level of the administrative hierarchy, broadest first.
///
/// Units form a strict tree: sector → area → province → region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Region,
    Province,
    Area,
    Sector,
}

impl UnitKind {
    /// All levels, broadest first.
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Region,
        UnitKind::Province,
        UnitKind::Area,
        UnitKind::Sector,
    ];

    /// The next-broader level, `None` for regions.
    pub fn parent_kind(&self) -> Option<UnitKind> {
        match self {
            UnitKind::Region => None,
            UnitKind::Province => Some(UnitKind::Region),
            UnitKind::Area => Some(UnitKind::Province),
            UnitKind::Sector => Some(UnitKind::Area),
        }
    }

    /// The next-narrower level, `None` for sectors.
    pub fn child_kind(&self) -> Option<UnitKind> {
        match self {
            UnitKind::Region => Some(UnitKind::Province),
            UnitKind::Province => Some(UnitKind::Area),
            UnitKind::Area => Some(UnitKind::Sector),
            UnitKind::Sector => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Region => "region",
            UnitKind::Province => "province",
            UnitKind::Area => "area",
            UnitKind::Sector => "sector",
        }
    }

    pub fn parse(s: &str) -> Option<UnitKind> {
        match s {
            "region" => Some(UnitKind::Region),
            "province" => Some(UnitKind::Province),
            "area" => Some(UnitKind::Area),
            "sector" => Some(UnitKind::Sector),
            _ => None,
        }
    }
}

/// A node of the administrative hierarchy.
///
/// Created by administrative import; geometry rarely mutates afterwards.
/// The parent link may be absent while a unit awaits assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritorialUnit {
    pub id: String,
    /// Human-facing code, e.g. "L1" or "920".
    pub code: String,
    pub name: String,
    pub kind: UnitKind,
    pub geometry: MultiPolygon<f64>,
    /// Target trail count used by the completion-ratio aggregation.
    pub expected_trail_count: u32,
    pub parent_id: Option<String>,
}

// ============================================================================
// Trails
// ============================================================================

/// Survey/validation level of a trail, in increasing order of completeness.
///
/// Levels 0–2 are owned by the external synchronization pipeline; only the
/// 3⇄4 edge is governed by [`crate::validation::ValidationStateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrailStatus {
    Unsurveyed,
    Mapped,
    TechnicalDataComplete,
    ReadyForValidation,
    Validated,
}

impl TrailStatus {
    /// Numeric level as exchanged with the sync feed (0–4).
    pub fn level(&self) -> u8 {
        match self {
            TrailStatus::Unsurveyed => 0,
            TrailStatus::Mapped => 1,
            TrailStatus::TechnicalDataComplete => 2,
            TrailStatus::ReadyForValidation => 3,
            TrailStatus::Validated => 4,
        }
    }

    /// Parse a numeric level from the sync feed.
    pub fn from_level(level: u8) -> Option<TrailStatus> {
        match level {
            0 => Some(TrailStatus::Unsurveyed),
            1 => Some(TrailStatus::Mapped),
            2 => Some(TrailStatus::TechnicalDataComplete),
            3 => Some(TrailStatus::ReadyForValidation),
            4 => Some(TrailStatus::Validated),
            _ => None,
        }
    }
}

/// Typed descriptive attributes of a trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailProperties {
    /// Official trail number, e.g. "101".
    pub code: Option<String>,
    pub name: Option<String>,
    /// Application/source tag of the system that owns the record.
    pub source_app: Option<String>,
}

impl TrailProperties {
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn source_app(&self) -> Option<&str> {
        self.source_app.as_deref()
    }
}

/// Externally synchronized payload carried alongside a trail.
///
/// The state machine mirrors the validation status into `status_mirror`
/// when the payload is present, so exports of the synced record stay
/// consistent without re-reading the trail row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub source: String,
    /// Mirrored numeric status level, when the feed carries one.
    pub status_mirror: Option<u8>,
    /// Unix seconds of the last sync application.
    pub synced_at: Option<i64>,
}

/// A hiking route of the official network.
///
/// Geometry comes in three variants: the canonical official line, the
/// externally synced line, and a raw user upload kept for the validation
/// comparison. Status mutates only through the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trail {
    pub id: String,
    pub properties: TrailProperties,
    pub status: TrailStatus,
    /// Actor that validated the trail; set only by the state machine.
    pub validator_id: Option<String>,
    /// Unix seconds of validation; set only by the state machine.
    pub validation_date: Option<i64>,
    pub canonical_geometry: Option<MultiLineString<f64>>,
    pub synced_geometry: Option<MultiLineString<f64>>,
    pub raw_geometry: Option<MultiLineString<f64>>,
    pub sync_payload: Option<SyncPayload>,
}

impl Trail {
    /// Create a trail with no geometry at the unsurveyed level.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: TrailProperties::default(),
            status: TrailStatus::Unsurveyed,
            validator_id: None,
            validation_date: None,
            canonical_geometry: None,
            synced_geometry: None,
            raw_geometry: None,
            sync_payload: None,
        }
    }

    pub fn with_properties(mut self, properties: TrailProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_status(mut self, status: TrailStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_canonical_geometry(mut self, geometry: MultiLineString<f64>) -> Self {
        self.canonical_geometry = Some(geometry);
        self
    }
}

// ============================================================================
// Point features
// ============================================================================

/// Kind of a simple geometry-bearing feature near the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Hut,
    Spring,
    Poi,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Hut => "hut",
            FeatureKind::Spring => "spring",
            FeatureKind::Poi => "poi",
        }
    }

    pub fn parse(s: &str) -> Option<FeatureKind> {
        match s {
            "hut" => Some(FeatureKind::Hut),
            "spring" => Some(FeatureKind::Spring),
            "poi" => Some(FeatureKind::Poi),
            _ => None,
        }
    }
}

/// A hut, spring or generic point of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: String,
    pub kind: FeatureKind,
    pub name: Option<String>,
    pub geometry: Point<f64>,
}

// ============================================================================
// Actors
// ============================================================================

/// Territorial role of an actor, governing authorization scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerritorialRole {
    Admin,
    National,
    Regional,
    Local,
    Unknown,
}

/// A user acting on the registry.
///
/// Supplied explicitly to the authorization resolver and the state machine;
/// never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: TerritorialRole,
    /// Assigned region, meaningful for regional actors.
    pub region_id: Option<String>,
    /// Assigned units at province/area/sector granularity, for local actors.
    pub unit_ids: Vec<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: TerritorialRole) -> Self {
        Self {
            id: id.into(),
            role,
            region_id: None,
            unit_ids: Vec::new(),
        }
    }

    pub fn with_region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    pub fn with_units(mut self, unit_ids: Vec<String>) -> Self {
        self.unit_ids = unit_ids;
        self
    }
}

// ============================================================================
// Geometry currency
// ============================================================================

/// Geometry of an entity as consumed by the computation engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerritoryGeometry {
    Line(MultiLineString<f64>),
    Polygon(MultiPolygon<f64>),
    Point(Point<f64>),
}

impl TerritoryGeometry {
    /// Whether the geometry carries no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            TerritoryGeometry::Line(line) => line.iter().all(|ls| ls.0.is_empty()),
            TerritoryGeometry::Polygon(polygon) => polygon.0.is_empty(),
            TerritoryGeometry::Point(_) => false,
        }
    }

    /// View as a generic `geo` geometry for predicate evaluation.
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            TerritoryGeometry::Line(line) => Geometry::MultiLineString(line.clone()),
            TerritoryGeometry::Polygon(polygon) => Geometry::MultiPolygon(polygon.clone()),
            TerritoryGeometry::Point(point) => Geometry::Point(*point),
        }
    }

    /// All vertices of the geometry.
    pub fn vertices(&self) -> Vec<Point<f64>> {
        match self {
            TerritoryGeometry::Line(line) => line
                .iter()
                .flat_map(|ls| ls.0.iter())
                .map(|c| Point::new(c.x, c.y))
                .collect(),
            TerritoryGeometry::Polygon(polygon) => polygon
                .iter()
                .flat_map(|poly| {
                    std::iter::once(poly.exterior())
                        .chain(poly.interiors())
                        .flat_map(|ring| ring.0.iter())
                })
                .map(|c| Point::new(c.x, c.y))
                .collect(),
            TerritoryGeometry::Point(point) => vec![*point],
        }
    }
}

/// Capability of entities that carry geometry usable for territorial
/// assignment.
pub trait HasTerritoryGeometry {
    /// The geometry the computers should use, if any.
    fn territory_geometry(&self) -> Option<TerritoryGeometry>;
}

impl HasTerritoryGeometry for Trail {
    fn territory_geometry(&self) -> Option<TerritoryGeometry> {
        self.canonical_geometry
            .as_ref()
            .map(|line| TerritoryGeometry::Line(line.clone()))
    }
}

impl HasTerritoryGeometry for TerritorialUnit {
    fn territory_geometry(&self) -> Option<TerritoryGeometry> {
        Some(TerritoryGeometry::Polygon(self.geometry.clone()))
    }
}

impl HasTerritoryGeometry for PointFeature {
    fn territory_geometry(&self) -> Option<TerritoryGeometry> {
        Some(TerritoryGeometry::Point(self.geometry))
    }
}
