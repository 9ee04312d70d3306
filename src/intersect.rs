//! Weighted overlap between entity geometry and territorial polygons.
//!
//! Produces one territory link per candidate unit the entity measurably
//! overlaps. Fractions are portions of the entity's own length (linear
//! entities) or area (polygonal entities), so an entity crossing a boundary
//! is split proportionally instead of being counted twice. Candidate sets
//! are per hierarchy level; callers invoke this once per level.

use geo::{Area, BooleanOps, Contains, HaversineLength};
use log::debug;

use crate::error::{RegistryError, Result};
use crate::geo_utils::line_length_m;
use crate::ledger::TerritoryLink;
use crate::model::{TerritorialUnit, TerritoryGeometry};
use crate::ComputeConfig;

/// Compute weighted territory links for one entity against one level's
/// candidate units.
///
/// Absent or degenerate (zero length/area) geometry yields an empty list,
/// not an error. Non-finite coordinates are a computation failure: the
/// caller must not touch the ledger in that case.
///
/// Fractions below `config.min_link_fraction` are discarded as
/// boundary-touching noise.
pub fn compute_territory_links<'a>(
    entity_id: &str,
    geometry: Option<&TerritoryGeometry>,
    candidates: impl IntoIterator<Item = &'a TerritorialUnit>,
    config: &ComputeConfig,
) -> Result<Vec<TerritoryLink>> {
    let Some(geometry) = geometry else {
        return Ok(Vec::new());
    };
    if geometry.is_empty() {
        return Ok(Vec::new());
    }
    ensure_finite(entity_id, geometry)?;

    let mut links = Vec::new();
    match geometry {
        TerritoryGeometry::Line(line) => {
            let total = line_length_m(line);
            if total <= 0.0 {
                return Ok(Vec::new());
            }
            for unit in candidates {
                let inside = unit.geometry.clip(line, false);
                let fraction = (inside.haversine_length() / total).min(1.0);
                push_link(&mut links, entity_id, unit, fraction, config);
            }
        }
        TerritoryGeometry::Polygon(polygon) => {
            let total = polygon.unsigned_area();
            if total <= 0.0 {
                return Ok(Vec::new());
            }
            for unit in candidates {
                let overlap = unit.geometry.intersection(polygon);
                let fraction = (overlap.unsigned_area() / total).min(1.0);
                push_link(&mut links, entity_id, unit, fraction, config);
            }
        }
        TerritoryGeometry::Point(point) => {
            for unit in candidates {
                let fraction = if unit.geometry.contains(point) { 1.0 } else { 0.0 };
                push_link(&mut links, entity_id, unit, fraction, config);
            }
        }
    }

    debug!(
        "territory links for '{}': {} of candidates retained",
        entity_id,
        links.len()
    );
    Ok(links)
}

fn push_link(
    links: &mut Vec<TerritoryLink>,
    entity_id: &str,
    unit: &TerritorialUnit,
    fraction: f64,
    config: &ComputeConfig,
) {
    if fraction >= config.min_link_fraction {
        links.push(TerritoryLink {
            entity_id: entity_id.to_string(),
            unit_id: unit.id.clone(),
            fraction,
        });
    }
}

fn ensure_finite(entity_id: &str, geometry: &TerritoryGeometry) -> Result<()> {
    let finite = geometry
        .vertices()
        .iter()
        .all(|p| p.x().is_finite() && p.y().is_finite());
    if finite {
        Ok(())
    } else {
        Err(RegistryError::Computation {
            entity_id: entity_id.to_string(),
            detail: "geometry contains non-finite coordinates".to_string(),
        })
    }
}
