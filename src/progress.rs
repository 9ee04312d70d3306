//! Completion-ratio ("SAL") aggregation over the territorial hierarchy.
//!
//! The ratio of a unit is derived at read time from the ledger; nothing is
//! persisted, so it can never go stale. Callers may cache the result.

use std::collections::HashMap;

use crate::error::Result;
use crate::ledger::LinkLedger;
use crate::model::{TerritorialUnit, TrailStatus, UnitKind};

/// Completion ratio of a territorial unit.
///
/// `display()` is clamped for presentation; the unclamped value stays
/// available because `expected_count` targets are sometimes miscalibrated
/// and the overshoot is itself a useful diagnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalRatio {
    /// Area-weighted count of member trails at ready-for-validation or
    /// validated status.
    pub weighted_count: f64,
    /// The unit's expected-trail-count target.
    pub expected_count: u32,
}

impl SalRatio {
    /// Ratio clamped to [0, 1]. Zero when no target is configured.
    pub fn display(&self) -> f64 {
        match self.raw() {
            Some(raw) => raw.clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    /// Unclamped ratio; `None` when `expected_count` is zero.
    pub fn raw(&self) -> Option<f64> {
        if self.expected_count == 0 {
            None
        } else {
            Some(self.weighted_count / f64::from(self.expected_count))
        }
    }
}

/// Compute the completion ratio of a unit.
///
/// Each trail at status 3 or 4 contributes its territory-link fraction for
/// the unit at the unit's own level. A trail that straddles two child units
/// therefore counts proportionally in each, and exactly once at the parent.
///
/// `descendants` are all units strictly below `unit` in the tree. Trails
/// that only carry links to descendants (no direct link at the unit's
/// level) contribute their per-level fraction sum, taking the
/// best-covered level and clamping at 1 so one trail never counts more
/// than once.
///
/// `status_of` resolves an entity id to a trail status; non-trail entities
/// resolve to `None` and are ignored.
pub fn completion_ratio<L: LinkLedger>(
    ledger: &L,
    unit: &TerritorialUnit,
    descendants: &[&TerritorialUnit],
    status_of: impl Fn(&str) -> Option<TrailStatus>,
) -> Result<SalRatio> {
    let counts_toward_sal =
        |entity_id: &str| matches!(status_of(entity_id), Some(s) if s >= TrailStatus::ReadyForValidation);

    // Direct links at the unit's own level.
    let mut direct: HashMap<String, f64> = HashMap::new();
    for link in ledger.links_into_unit(&unit.id)? {
        if counts_toward_sal(&link.entity_id) {
            direct.insert(link.entity_id.clone(), link.fraction);
        }
    }

    // Trails reaching the unit only through descendant links: sum fractions
    // per level, then take the best-covered level.
    let mut fallback: HashMap<String, HashMap<UnitKind, f64>> = HashMap::new();
    for descendant in descendants {
        for link in ledger.links_into_unit(&descendant.id)? {
            if direct.contains_key(&link.entity_id) || !counts_toward_sal(&link.entity_id) {
                continue;
            }
            *fallback
                .entry(link.entity_id.clone())
                .or_default()
                .entry(descendant.kind)
                .or_insert(0.0) += link.fraction;
        }
    }

    let mut weighted_count: f64 = direct.values().sum();
    for per_level in fallback.values() {
        let best = per_level.values().fold(0.0f64, |acc, &v| acc.max(v));
        weighted_count += best.min(1.0);
    }

    Ok(SalRatio {
        weighted_count,
        expected_count: unit.expected_trail_count,
    })
}
