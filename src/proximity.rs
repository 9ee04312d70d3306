//! Buffered proximity between a reference geometry and nearby features.
//!
//! Distances are ellipsoidal (WGS84 geodesic), not planar. The buffer
//! boundary is inclusive: a target at exactly the radius is linked.

use log::debug;

use crate::error::{RegistryError, Result};
use crate::geo_utils::min_geodesic_distance;
use crate::ledger::ProximityLink;
use crate::model::TerritoryGeometry;

/// Buffer membership predicate. The boundary is inclusive by policy.
pub fn within_buffer(distance_m: f64, radius_m: u32) -> bool {
    distance_m <= f64::from(radius_m)
}

/// Compute proximity links from a reference geometry to candidate targets
/// of one feature kind.
///
/// Each link records the radius it was computed with; replacement in the
/// ledger is scoped to that same radius, so computations with different
/// radii for the same target kind never clobber each other.
///
/// Absent reference geometry yields an empty list.
pub fn compute_proximity_links<'a>(
    entity_id: &str,
    reference: Option<&TerritoryGeometry>,
    targets: impl IntoIterator<Item = (&'a str, &'a TerritoryGeometry)>,
    radius_m: u32,
) -> Result<Vec<ProximityLink>> {
    let Some(reference) = reference else {
        return Ok(Vec::new());
    };
    if reference.is_empty() {
        return Ok(Vec::new());
    }
    if !reference
        .vertices()
        .iter()
        .all(|p| p.x().is_finite() && p.y().is_finite())
    {
        return Err(RegistryError::Computation {
            entity_id: entity_id.to_string(),
            detail: "reference geometry contains non-finite coordinates".to_string(),
        });
    }

    let mut links = Vec::new();
    for (target_id, target_geometry) in targets {
        if target_id == entity_id {
            continue;
        }
        let Some(distance) = min_geodesic_distance(reference, target_geometry) else {
            continue;
        };
        if within_buffer(distance, radius_m) {
            links.push(ProximityLink {
                entity_id: entity_id.to_string(),
                target_id: target_id.to_string(),
                radius_m,
                distance_m: distance,
            });
        }
    }

    debug!(
        "proximity links for '{}' at {} m: {} targets in buffer",
        entity_id,
        radius_m,
        links.len()
    );
    Ok(links)
}
