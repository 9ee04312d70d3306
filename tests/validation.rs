//! Tests for the validation state machine.

use geo::{LineString, MultiLineString};
use trailnet::{
    Actor, CorridorChecker, GeometryChecker, LinkLedger, MemoryLedger, SyncPayload,
    TerritorialRole, TerritoryLink, Trail, TrailStatus, UnitKind, ValidationOutcome,
    ValidationRejection, ValidationStateMachine,
};

fn canonical_line() -> MultiLineString<f64> {
    MultiLineString::new(vec![LineString::from(vec![
        (0.0, 0.0),
        (0.005, 0.0),
        (0.01, 0.0),
    ])])
}

/// Canonical line shifted north by roughly `meters`.
fn shifted_line(meters: f64) -> MultiLineString<f64> {
    let d_lat = meters / 111_320.0;
    MultiLineString::new(vec![LineString::from(vec![
        (0.0, d_lat),
        (0.005, d_lat),
        (0.01, d_lat),
    ])])
}

fn ready_trail() -> Trail {
    let mut trail = Trail::new("trail-1")
        .with_status(TrailStatus::ReadyForValidation)
        .with_canonical_geometry(canonical_line());
    trail.raw_geometry = Some(shifted_line(5.0));
    trail.sync_payload = Some(SyncPayload {
        source: "feed".to_string(),
        status_mirror: Some(3),
        synced_at: Some(1_700_000_000),
    });
    trail
}

fn sector_link(entity: &str) -> TerritoryLink {
    TerritoryLink {
        entity_id: entity.to_string(),
        unit_id: "s1".to_string(),
        fraction: 1.0,
    }
}

fn admin() -> Actor {
    Actor::new("admin-1", TerritorialRole::Admin)
}

#[test]
fn validate_happy_path_stamps_and_mirrors() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();

    let outcome = machine.validate(&mut trail, &admin(), 1_722_800_000).unwrap();

    assert_eq!(outcome, ValidationOutcome::Accepted);
    assert_eq!(trail.status, TrailStatus::Validated);
    assert_eq!(trail.validator_id.as_deref(), Some("admin-1"));
    assert_eq!(trail.validation_date, Some(1_722_800_000));
    assert_eq!(trail.sync_payload.as_ref().unwrap().status_mirror, Some(4));
}

#[test]
fn validate_twice_rejects_with_not_ready() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();

    machine.validate(&mut trail, &admin(), 1_722_800_000).unwrap();
    let outcome = machine.validate(&mut trail, &admin(), 1_722_800_100).unwrap();

    assert_eq!(
        outcome,
        ValidationOutcome::Rejected(ValidationRejection::NotReady)
    );
    // The first stamp survives.
    assert_eq!(trail.validation_date, Some(1_722_800_000));
}

#[test]
fn skipping_levels_is_always_rejected() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);

    for status in [
        TrailStatus::Unsurveyed,
        TrailStatus::Mapped,
        TrailStatus::TechnicalDataComplete,
    ] {
        let mut trail = ready_trail().with_status(status);
        let outcome = machine.validate(&mut trail, &admin(), 0).unwrap();
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected(ValidationRejection::NotReady)
        );
        assert_eq!(trail.status, status);
    }
}

#[test]
fn unauthorized_actor_is_rejected_before_geometry_checks() {
    let ledger = MemoryLedger::new();
    ledger
        .replace_territory_links("trail-1", UnitKind::Sector, vec![sector_link("trail-1")])
        .unwrap();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);

    let outsider = Actor::new("vol-1", TerritorialRole::Local)
        .with_units(vec!["s9".to_string()]);
    let mut trail = ready_trail();
    // No raw geometry either: authorization is still the reported reason.
    trail.raw_geometry = None;

    let outcome = machine.validate(&mut trail, &outsider, 0).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Rejected(ValidationRejection::Unauthorized)
    );
}

#[test]
fn missing_raw_geometry_is_rejected() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();
    trail.raw_geometry = None;

    let outcome = machine.validate(&mut trail, &admin(), 0).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Rejected(ValidationRejection::MissingGeometry)
    );
    assert_eq!(trail.status, TrailStatus::ReadyForValidation);
}

#[test]
fn divergent_raw_geometry_is_rejected() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();
    trail.raw_geometry = Some(shifted_line(500.0));

    let outcome = machine.validate(&mut trail, &admin(), 0).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Rejected(ValidationRejection::GeometryIncorrect)
    );
    assert_eq!(trail.status, TrailStatus::ReadyForValidation);
    assert!(trail.validator_id.is_none());
}

#[test]
fn revert_clears_the_stamp() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();
    machine.validate(&mut trail, &admin(), 1_722_800_000).unwrap();

    let outcome = machine.revert_validation(&mut trail, &admin()).unwrap();

    assert_eq!(outcome, ValidationOutcome::Accepted);
    assert_eq!(trail.status, TrailStatus::ReadyForValidation);
    assert!(trail.validator_id.is_none());
    assert!(trail.validation_date.is_none());
    assert_eq!(trail.sync_payload.as_ref().unwrap().status_mirror, Some(3));
}

#[test]
fn revert_on_non_validated_trail_rejects_with_wrong_state() {
    let ledger = MemoryLedger::new();
    let checker = CorridorChecker::new(30.0);
    let machine = ValidationStateMachine::new(&ledger, &checker);
    let mut trail = ready_trail();

    let outcome = machine.revert_validation(&mut trail, &admin()).unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::Rejected(ValidationRejection::WrongState)
    );
}

#[test]
fn rejection_reason_codes_are_stable() {
    assert_eq!(ValidationRejection::NotReady.as_str(), "not-ready");
    assert_eq!(ValidationRejection::Unauthorized.as_str(), "unauthorized");
    assert_eq!(
        ValidationRejection::MissingGeometry.as_str(),
        "missing-geometry"
    );
    assert_eq!(
        ValidationRejection::GeometryIncorrect.as_str(),
        "geometry-incorrect"
    );
    assert_eq!(ValidationRejection::WrongState.as_str(), "wrong-state");
}

#[test]
fn corridor_checker_tolerates_gps_noise_only() {
    let checker = CorridorChecker::new(30.0);
    let canonical = canonical_line();

    assert!(checker.matches(&canonical, &shifted_line(8.0)).unwrap());
    assert!(!checker.matches(&canonical, &shifted_line(120.0)).unwrap());
}
