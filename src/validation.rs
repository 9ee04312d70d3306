//! Guarded transitions of a trail's validation status.
//!
//! The external sync pipeline owns levels 0–2; the core governs only the
//! 3⇄4 edge. Every rejection is a typed reason code the caller can render
//! precisely — the machine never fails with an opaque error for a refused
//! transition.
//!
//! Callers must hold the trail's row lock for the whole check-and-write;
//! the registry engine does this when it hands the `&mut Trail` in.

use geo::{Closest, ClosestPoint, GeodesicDistance, MultiLineString, Point};
use serde::{Deserialize, Serialize};

use crate::authorize::AuthorizationResolver;
use crate::error::Result;
use crate::ledger::LinkLedger;
use crate::model::{Actor, Trail, TrailStatus};

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRejection {
    /// `validate` called on a trail that is not at ready-for-validation.
    NotReady,
    /// The actor's territorial scope does not cover the trail.
    Unauthorized,
    /// No raw comparison geometry (or no canonical geometry to compare
    /// against) has been uploaded.
    MissingGeometry,
    /// The raw upload does not match the canonical geometry within
    /// tolerance.
    GeometryIncorrect,
    /// `revert_validation` called on a trail that is not validated.
    WrongState,
}

impl ValidationRejection {
    /// Stable reason code for the admin layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRejection::NotReady => "not-ready",
            ValidationRejection::Unauthorized => "unauthorized",
            ValidationRejection::MissingGeometry => "missing-geometry",
            ValidationRejection::GeometryIncorrect => "geometry-incorrect",
            ValidationRejection::WrongState => "wrong-state",
        }
    }
}

/// Result of a transition attempt. Refusals are data, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(ValidationRejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

/// Geometric-correctness check of a raw upload against the canonical line.
pub trait GeometryChecker {
    fn matches(&self, canonical: &MultiLineString<f64>, raw: &MultiLineString<f64>)
        -> Result<bool>;
}

/// Default checker: symmetric mean-minimum-distance comparison.
///
/// For each vertex of one line, the distance to the closest point of the
/// other line is measured; both directed means must stay within
/// `tolerance_m`. Robust to differing point densities and to GPS noise on
/// the raw upload.
#[derive(Debug, Clone)]
pub struct CorridorChecker {
    pub tolerance_m: f64,
}

impl CorridorChecker {
    pub fn new(tolerance_m: f64) -> Self {
        Self { tolerance_m }
    }
}

impl GeometryChecker for CorridorChecker {
    fn matches(
        &self,
        canonical: &MultiLineString<f64>,
        raw: &MultiLineString<f64>,
    ) -> Result<bool> {
        let raw_to_canonical = mean_min_distance(raw, canonical);
        let canonical_to_raw = mean_min_distance(canonical, raw);
        Ok(raw_to_canonical <= self.tolerance_m && canonical_to_raw <= self.tolerance_m)
    }
}

/// Mean distance from each vertex of `from` to the closest point of `to`.
fn mean_min_distance(from: &MultiLineString<f64>, to: &MultiLineString<f64>) -> f64 {
    let vertices: Vec<Point<f64>> = from
        .iter()
        .flat_map(|ls| ls.0.iter())
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if vertices.is_empty() {
        return f64::INFINITY;
    }

    let total: f64 = vertices
        .iter()
        .map(|p| match to.closest_point(p) {
            Closest::Intersection(q) | Closest::SinglePoint(q) => p.geodesic_distance(&q),
            Closest::Indeterminate => f64::INFINITY,
        })
        .sum();
    total / vertices.len() as f64
}

/// The guarded 3⇄4 transition logic.
pub struct ValidationStateMachine<'a, L: LinkLedger> {
    ledger: &'a L,
    checker: &'a dyn GeometryChecker,
}

impl<'a, L: LinkLedger> ValidationStateMachine<'a, L> {
    pub fn new(ledger: &'a L, checker: &'a dyn GeometryChecker) -> Self {
        Self { ledger, checker }
    }

    /// Promote a ready-for-validation trail to validated.
    ///
    /// Checks run in order: state, authorization, raw-geometry presence,
    /// geometric correctness. On success the validator identity and
    /// timestamp are stamped and the status is mirrored into the sync
    /// payload when one is present.
    pub fn validate(
        &self,
        trail: &mut Trail,
        actor: &Actor,
        now: i64,
    ) -> Result<ValidationOutcome> {
        if trail.status != TrailStatus::ReadyForValidation {
            return Ok(ValidationOutcome::Rejected(ValidationRejection::NotReady));
        }
        if !AuthorizationResolver::new(self.ledger).can_manage(actor, &trail.id)? {
            return Ok(ValidationOutcome::Rejected(ValidationRejection::Unauthorized));
        }
        let (Some(canonical), Some(raw)) = (&trail.canonical_geometry, &trail.raw_geometry)
        else {
            return Ok(ValidationOutcome::Rejected(
                ValidationRejection::MissingGeometry,
            ));
        };
        if !self.checker.matches(canonical, raw)? {
            return Ok(ValidationOutcome::Rejected(
                ValidationRejection::GeometryIncorrect,
            ));
        }

        trail.status = TrailStatus::Validated;
        trail.validator_id = Some(actor.id.clone());
        trail.validation_date = Some(now);
        if let Some(payload) = trail.sync_payload.as_mut() {
            payload.status_mirror = Some(TrailStatus::Validated.level());
        }
        Ok(ValidationOutcome::Accepted)
    }

    /// Demote a validated trail back to ready-for-validation.
    ///
    /// Clears the validator identity and timestamp.
    pub fn revert_validation(&self, trail: &mut Trail, actor: &Actor) -> Result<ValidationOutcome> {
        if trail.status != TrailStatus::Validated {
            return Ok(ValidationOutcome::Rejected(ValidationRejection::WrongState));
        }
        if !AuthorizationResolver::new(self.ledger).can_manage(actor, &trail.id)? {
            return Ok(ValidationOutcome::Rejected(ValidationRejection::Unauthorized));
        }

        trail.status = TrailStatus::ReadyForValidation;
        trail.validator_id = None;
        trail.validation_date = None;
        if let Some(payload) = trail.sync_payload.as_mut() {
            payload.status_mirror = Some(TrailStatus::ReadyForValidation.level());
        }
        Ok(ValidationOutcome::Accepted)
    }
}
