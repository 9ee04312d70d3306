//! External synchronization import.
//!
//! The sync feed delivers geometry as WKT (SRID 4326) and a numeric status
//! level. Levels 0–2 are owned by the feed and applied here; levels 3–4
//! belong to the validation state machine and are never applied from sync —
//! a validated trail keeps its status across sync runs.

use geo::Geometry;
use log::warn;
use wkt::{ToWkt, TryFromWkt};

use crate::error::{RegistryError, Result};
use crate::model::{SyncPayload, TerritoryGeometry, Trail, TrailStatus};

/// One record of the external feed, as handed to the importer.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub entity_id: String,
    /// Source application tag of the feed.
    pub source: String,
    /// Numeric survey level claimed by the feed (only 0–2 are honored).
    pub status_level: Option<u8>,
    /// Geometry as WKT, when the feed carries one.
    pub geometry_wkt: Option<String>,
    /// Unix seconds of the sync run.
    pub synced_at: i64,
}

/// Parse WKT into the geometry currency of the computers.
pub fn parse_wkt_geometry(wkt_str: &str) -> Result<TerritoryGeometry> {
    let geometry: Geometry<f64> =
        Geometry::try_from_wkt_str(wkt_str).map_err(|e| RegistryError::Wkt {
            detail: e.to_string(),
        })?;
    match geometry {
        Geometry::Point(p) => Ok(TerritoryGeometry::Point(p)),
        Geometry::LineString(ls) => Ok(TerritoryGeometry::Line(ls.into())),
        Geometry::MultiLineString(mls) => Ok(TerritoryGeometry::Line(mls)),
        Geometry::Polygon(poly) => Ok(TerritoryGeometry::Polygon(poly.into())),
        Geometry::MultiPolygon(mp) => Ok(TerritoryGeometry::Polygon(mp)),
        other => Err(RegistryError::Wkt {
            detail: format!("unsupported geometry type: {:?}", kind_name(&other)),
        }),
    }
}

/// Print a geometry as WKT for export back to the feed.
pub fn to_wkt_string(geometry: &TerritoryGeometry) -> String {
    geometry.to_geometry().wkt_string()
}

fn kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Capability of entities the external feed can update.
pub trait Syncable {
    /// Apply one feed record. Returns whether the entity's territory
    /// geometry changed, so the caller knows to re-run the computers.
    fn apply_sync(&mut self, record: &SyncRecord) -> Result<bool>;
}

impl Syncable for Trail {
    fn apply_sync(&mut self, record: &SyncRecord) -> Result<bool> {
        let mut geometry_changed = false;

        if let Some(wkt_str) = record.geometry_wkt.as_deref() {
            let TerritoryGeometry::Line(line) = parse_wkt_geometry(wkt_str)? else {
                return Err(RegistryError::InvalidGeometry {
                    entity_id: self.id.clone(),
                    detail: "sync geometry for a trail must be linear".to_string(),
                });
            };
            self.synced_geometry = Some(line.clone());
            // The synced line becomes canonical until an official one exists.
            if self.canonical_geometry.is_none() {
                self.canonical_geometry = Some(line);
                geometry_changed = true;
            }
        }

        if let Some(level) = record.status_level {
            match TrailStatus::from_level(level) {
                Some(new_status) if new_status <= TrailStatus::TechnicalDataComplete => {
                    if self.status <= TrailStatus::TechnicalDataComplete {
                        self.status = new_status;
                    }
                }
                Some(_) => {
                    warn!(
                        "sync for trail '{}' claimed level {}; levels above 2 are owned by validation",
                        self.id, level
                    );
                }
                None => {
                    warn!("sync for trail '{}' carried unknown level {}", self.id, level);
                }
            }
        }

        let payload = self.sync_payload.get_or_insert_with(SyncPayload::default);
        payload.source = record.source.clone();
        payload.synced_at = Some(record.synced_at);
        payload.status_mirror = Some(self.status.level());

        Ok(geometry_changed)
    }
}
