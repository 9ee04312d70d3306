//! Persistence of weighted and buffered association sets.
//!
//! The ledger owns the link rows produced by the intersection and proximity
//! computers. Replacement is all-or-nothing per scope: territory links are
//! scoped per (entity, hierarchy level), proximity links per (entity,
//! target kind, radius). Readers never observe a half-replaced set.
//!
//! Writers for the same entity are serialized through an entity lock
//! registry; writers for different entities proceed in parallel. Domain
//! events are published to registered sinks only after a successful write,
//! so side effects (cache invalidation, checkpoint assignment) stay outside
//! the write path.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::model::{FeatureKind, UnitKind};

// ============================================================================
// Link rows
// ============================================================================

/// Weighted association between an entity and a territorial unit.
///
/// `fraction` is the portion of the entity's own length or area contained
/// in the unit, in (0, 1]. The fractions of one entity at one level sum to
/// at most 1; a remainder below 1 means the entity extends outside all
/// known units of that level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryLink {
    pub entity_id: String,
    pub unit_id: String,
    pub fraction: f64,
}

/// Buffered association between an entity and a nearby feature.
///
/// Invariant: `distance_m <= radius_m` (the buffer boundary is inclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityLink {
    pub entity_id: String,
    pub target_id: String,
    pub radius_m: u32,
    pub distance_m: f64,
}

/// Replacement scope of one proximity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProximityScope {
    pub target: FeatureKind,
    pub radius_m: u32,
}

impl ProximityScope {
    pub fn new(target: FeatureKind, radius_m: u32) -> Self {
        Self { target, radius_m }
    }
}

// ============================================================================
// Domain events
// ============================================================================

/// Event published after a successful ledger write.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    TerritoryLinksReplaced {
        entity_id: String,
        level: UnitKind,
        link_count: usize,
    },
    ProximityLinksReplaced {
        entity_id: String,
        scope: ProximityScope,
        link_count: usize,
    },
}

/// Consumer of ledger events. Called after the write committed, outside any
/// ledger lock; implementations must be thread-safe.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);
}

impl<S: EventSink> EventSink for Arc<S> {
    fn on_event(&self, event: &LedgerEvent) {
        self.as_ref().on_event(event);
    }
}

/// Sink that records every event. Useful for testing and as a reference
/// implementation.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &LedgerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Ledger contract
// ============================================================================

/// Storage contract for association links.
///
/// Implemented by the in-memory [`MemoryLedger`] and, behind the
/// `persistence` feature, by `SqliteLedger`.
pub trait LinkLedger: Send + Sync {
    /// Atomically replace all territory links of one entity at one level.
    ///
    /// Rejects the whole batch (and writes nothing) if any link violates
    /// the fraction invariant or names a different entity.
    fn replace_territory_links(
        &self,
        entity_id: &str,
        level: UnitKind,
        links: Vec<TerritoryLink>,
    ) -> Result<()>;

    /// Atomically replace all proximity links of one entity in one scope.
    fn replace_proximity_links(
        &self,
        entity_id: &str,
        scope: ProximityScope,
        links: Vec<ProximityLink>,
    ) -> Result<()>;

    /// Territory links of an entity at one level.
    fn territory_links(&self, entity_id: &str, level: UnitKind) -> Result<Vec<TerritoryLink>>;

    /// Territory links of an entity across all levels.
    fn all_territory_links(&self, entity_id: &str) -> Result<Vec<TerritoryLink>>;

    /// Proximity links of an entity in one scope.
    fn proximity_links(&self, entity_id: &str, scope: ProximityScope)
        -> Result<Vec<ProximityLink>>;

    /// Territory links of every entity into one unit.
    fn links_into_unit(&self, unit_id: &str) -> Result<Vec<TerritoryLink>>;
}

pub(crate) fn check_territory_batch(entity_id: &str, links: &[TerritoryLink]) -> Result<()> {
    for link in links {
        if link.entity_id != entity_id {
            return Err(RegistryError::InvalidGeometry {
                entity_id: entity_id.to_string(),
                detail: format!("link batch contains foreign entity '{}'", link.entity_id),
            });
        }
        if !(link.fraction > 0.0 && link.fraction <= 1.0) {
            return Err(RegistryError::InvalidGeometry {
                entity_id: entity_id.to_string(),
                detail: format!(
                    "overlap fraction {} for unit '{}' outside (0, 1]",
                    link.fraction, link.unit_id
                ),
            });
        }
    }
    Ok(())
}

pub(crate) fn check_proximity_batch(
    entity_id: &str,
    scope: ProximityScope,
    links: &[ProximityLink],
) -> Result<()> {
    for link in links {
        if link.entity_id != entity_id {
            return Err(RegistryError::InvalidGeometry {
                entity_id: entity_id.to_string(),
                detail: format!("link batch contains foreign entity '{}'", link.entity_id),
            });
        }
        if link.radius_m != scope.radius_m || link.distance_m > f64::from(link.radius_m) {
            return Err(RegistryError::InvalidGeometry {
                entity_id: entity_id.to_string(),
                detail: format!(
                    "distance {} m for target '{}' violates {} m buffer",
                    link.distance_m, link.target_id, scope.radius_m
                ),
            });
        }
    }
    Ok(())
}

// ============================================================================
// In-memory ledger
// ============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    /// entity id -> level -> links
    territory: HashMap<String, BTreeMap<UnitKind, Vec<TerritoryLink>>>,
    /// entity id -> scope -> links
    proximity: HashMap<String, HashMap<ProximityScope, Vec<ProximityLink>>>,
    /// unit id -> entity ids with territory links into it
    by_unit: HashMap<String, HashSet<String>>,
}

/// In-memory association ledger.
///
/// A single state lock keeps the forward maps and the unit reverse index
/// consistent under every read.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    writers: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    sinks: RwLock<Vec<Box<dyn EventSink>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink for post-write domain events.
    pub fn register_sink(&self, sink: Box<dyn EventSink>) {
        self.sinks.write().unwrap().push(sink);
    }

    /// Single-writer lock for one entity.
    fn writer_lock(&self, entity_id: &str) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().unwrap();
        writers
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn publish(&self, event: LedgerEvent) {
        for sink in self.sinks.read().unwrap().iter() {
            sink.on_event(&event);
        }
    }
}

impl LinkLedger for MemoryLedger {
    fn replace_territory_links(
        &self,
        entity_id: &str,
        level: UnitKind,
        links: Vec<TerritoryLink>,
    ) -> Result<()> {
        check_territory_batch(entity_id, &links)?;
        let link_count = links.len();
        {
            let lock = self.writer_lock(entity_id);
            let _serialized = lock.lock().unwrap();
            let mut state = self.state.write().unwrap();

            let old_units: Vec<String> = state
                .territory
                .get(entity_id)
                .and_then(|levels| levels.get(&level))
                .map(|old| old.iter().map(|l| l.unit_id.clone()).collect())
                .unwrap_or_default();
            for unit_id in old_units {
                let now_empty = match state.by_unit.get_mut(&unit_id) {
                    Some(entities) => {
                        entities.remove(entity_id);
                        entities.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    state.by_unit.remove(&unit_id);
                }
            }

            for link in &links {
                state
                    .by_unit
                    .entry(link.unit_id.clone())
                    .or_default()
                    .insert(entity_id.to_string());
            }
            state
                .territory
                .entry(entity_id.to_string())
                .or_default()
                .insert(level, links);
        }

        self.publish(LedgerEvent::TerritoryLinksReplaced {
            entity_id: entity_id.to_string(),
            level,
            link_count,
        });
        Ok(())
    }

    fn replace_proximity_links(
        &self,
        entity_id: &str,
        scope: ProximityScope,
        links: Vec<ProximityLink>,
    ) -> Result<()> {
        check_proximity_batch(entity_id, scope, &links)?;
        let link_count = links.len();
        {
            let lock = self.writer_lock(entity_id);
            let _serialized = lock.lock().unwrap();
            let mut state = self.state.write().unwrap();
            state
                .proximity
                .entry(entity_id.to_string())
                .or_default()
                .insert(scope, links);
        }

        self.publish(LedgerEvent::ProximityLinksReplaced {
            entity_id: entity_id.to_string(),
            scope,
            link_count,
        });
        Ok(())
    }

    fn territory_links(&self, entity_id: &str, level: UnitKind) -> Result<Vec<TerritoryLink>> {
        let state = self.state.read().unwrap();
        Ok(state
            .territory
            .get(entity_id)
            .and_then(|levels| levels.get(&level))
            .cloned()
            .unwrap_or_default())
    }

    fn all_territory_links(&self, entity_id: &str) -> Result<Vec<TerritoryLink>> {
        let state = self.state.read().unwrap();
        Ok(state
            .territory
            .get(entity_id)
            .map(|levels| levels.values().flatten().cloned().collect())
            .unwrap_or_default())
    }

    fn proximity_links(
        &self,
        entity_id: &str,
        scope: ProximityScope,
    ) -> Result<Vec<ProximityLink>> {
        let state = self.state.read().unwrap();
        Ok(state
            .proximity
            .get(entity_id)
            .and_then(|scopes| scopes.get(&scope))
            .cloned()
            .unwrap_or_default())
    }

    fn links_into_unit(&self, unit_id: &str) -> Result<Vec<TerritoryLink>> {
        let state = self.state.read().unwrap();
        let Some(entities) = state.by_unit.get(unit_id) else {
            return Ok(Vec::new());
        };
        let mut links = Vec::new();
        for entity_id in entities {
            if let Some(levels) = state.territory.get(entity_id) {
                for level_links in levels.values() {
                    links.extend(
                        level_links
                            .iter()
                            .filter(|l| l.unit_id == unit_id)
                            .cloned(),
                    );
                }
            }
        }
        Ok(links)
    }
}
