//! Territorial authorization over ledger reads.
//!
//! Pure function of the actor's role/assignments and the target entity's
//! territory links; never mutates anything. The actor is always an explicit
//! parameter — there is no ambient current-user context.

use std::collections::HashSet;

use crate::error::Result;
use crate::ledger::LinkLedger;
use crate::model::{Actor, TerritorialRole, UnitKind};

/// Resolves whether an actor may manage a target entity.
pub struct AuthorizationResolver<'a, L: LinkLedger> {
    ledger: &'a L,
}

impl<'a, L: LinkLedger> AuthorizationResolver<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Whether the actor may act on the entity.
    ///
    /// - `Unknown` never may.
    /// - `Admin` and `National` always may.
    /// - `Regional` may iff the entity has a region-level territory link to
    ///   the actor's assigned region.
    /// - `Local` may iff the entity's province/area/sector links intersect
    ///   the actor's assigned units.
    pub fn can_manage(&self, actor: &Actor, entity_id: &str) -> Result<bool> {
        match actor.role {
            TerritorialRole::Unknown => Ok(false),
            TerritorialRole::Admin | TerritorialRole::National => Ok(true),
            TerritorialRole::Regional => {
                let Some(region_id) = actor.region_id.as_deref() else {
                    return Ok(false);
                };
                let links = self.ledger.territory_links(entity_id, UnitKind::Region)?;
                Ok(links.iter().any(|link| link.unit_id == region_id))
            }
            TerritorialRole::Local => {
                if actor.unit_ids.is_empty() {
                    return Ok(false);
                }
                let assigned: HashSet<&str> =
                    actor.unit_ids.iter().map(String::as_str).collect();
                for level in [UnitKind::Province, UnitKind::Area, UnitKind::Sector] {
                    let links = self.ledger.territory_links(entity_id, level)?;
                    if links
                        .iter()
                        .any(|link| assigned.contains(link.unit_id.as_str()))
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}
