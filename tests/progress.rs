//! Tests for completion-ratio aggregation.

use std::collections::HashMap;

use geo::{polygon, MultiPolygon};
use trailnet::progress::completion_ratio;
use trailnet::{LinkLedger, MemoryLedger, TerritorialUnit, TerritoryLink, TrailStatus, UnitKind};

fn unit(id: &str, kind: UnitKind, expected: u32) -> TerritorialUnit {
    TerritorialUnit {
        id: id.to_string(),
        code: id.to_uppercase(),
        name: format!("Unit {id}"),
        kind,
        geometry: MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]),
        expected_trail_count: expected,
        parent_id: None,
    }
}

fn link(entity: &str, unit: &str, fraction: f64) -> TerritoryLink {
    TerritoryLink {
        entity_id: entity.to_string(),
        unit_id: unit.to_string(),
        fraction,
    }
}

fn statuses(entries: &[(&str, TrailStatus)]) -> HashMap<String, TrailStatus> {
    entries
        .iter()
        .map(|(id, status)| (id.to_string(), *status))
        .collect()
}

#[test]
fn weighted_count_over_expected() {
    let ledger = MemoryLedger::new();
    let sector = unit("s1", UnitKind::Sector, 10);

    let mut status_entries = Vec::new();
    for i in 0..7 {
        let id = format!("t{i}");
        ledger
            .replace_territory_links(&id, UnitKind::Sector, vec![link(&id, "s1", 1.0)])
            .unwrap();
        status_entries.push((id, TrailStatus::Validated));
    }
    ledger
        .replace_territory_links("t-half", UnitKind::Sector, vec![link("t-half", "s1", 0.5)])
        .unwrap();
    status_entries.push(("t-half".to_string(), TrailStatus::ReadyForValidation));

    let status_map: HashMap<String, TrailStatus> = status_entries.into_iter().collect();
    let ratio = completion_ratio(&ledger, &sector, &[], |id| status_map.get(id).copied()).unwrap();

    assert!((ratio.weighted_count - 7.5).abs() < 1e-9);
    assert_eq!(ratio.expected_count, 10);
    assert!((ratio.display() - 0.75).abs() < 1e-9);
    assert_eq!(ratio.raw(), Some(0.75));
}

#[test]
fn trails_below_ready_do_not_count() {
    let ledger = MemoryLedger::new();
    let sector = unit("s1", UnitKind::Sector, 4);
    for (id, status) in [
        ("t0", TrailStatus::Unsurveyed),
        ("t1", TrailStatus::Mapped),
        ("t2", TrailStatus::TechnicalDataComplete),
        ("t3", TrailStatus::ReadyForValidation),
    ] {
        ledger
            .replace_territory_links(id, UnitKind::Sector, vec![link(id, "s1", 1.0)])
            .unwrap();
    }
    let status_map = statuses(&[
        ("t0", TrailStatus::Unsurveyed),
        ("t1", TrailStatus::Mapped),
        ("t2", TrailStatus::TechnicalDataComplete),
        ("t3", TrailStatus::ReadyForValidation),
    ]);

    let ratio = completion_ratio(&ledger, &sector, &[], |id| status_map.get(id).copied()).unwrap();
    assert!((ratio.weighted_count - 1.0).abs() < 1e-9);
    assert_eq!(ratio.raw(), Some(0.25));
}

#[test]
fn overshoot_is_clamped_for_display_but_kept_raw() {
    let ledger = MemoryLedger::new();
    let sector = unit("s1", UnitKind::Sector, 2);
    let mut status_map = HashMap::new();
    for i in 0..3 {
        let id = format!("t{i}");
        ledger
            .replace_territory_links(&id, UnitKind::Sector, vec![link(&id, "s1", 1.0)])
            .unwrap();
        status_map.insert(id, TrailStatus::Validated);
    }

    let ratio = completion_ratio(&ledger, &sector, &[], |id| status_map.get(id).copied()).unwrap();
    assert_eq!(ratio.display(), 1.0);
    assert_eq!(ratio.raw(), Some(1.5));
}

#[test]
fn parent_counts_a_boundary_crossing_trail_once() {
    let ledger = MemoryLedger::new();
    let area = unit("a1", UnitKind::Area, 1);
    let s1 = unit("s1", UnitKind::Sector, 1);
    let s2 = unit("s2", UnitKind::Sector, 1);

    // One trail straddling both sectors; each level carries its own links.
    ledger
        .replace_territory_links(
            "t1",
            UnitKind::Sector,
            vec![link("t1", "s1", 0.6), link("t1", "s2", 0.4)],
        )
        .unwrap();
    ledger
        .replace_territory_links("t1", UnitKind::Area, vec![link("t1", "a1", 1.0)])
        .unwrap();
    let status_map = statuses(&[("t1", TrailStatus::Validated)]);

    let ratio =
        completion_ratio(&ledger, &area, &[&s1, &s2], |id| status_map.get(id).copied()).unwrap();
    // Exactly once at the parent, not 0.6 + 0.4 + 1.0.
    assert!((ratio.weighted_count - 1.0).abs() < 1e-9);
}

#[test]
fn descendant_links_cover_trails_missing_a_direct_link() {
    let ledger = MemoryLedger::new();
    let area = unit("a1", UnitKind::Area, 2);
    let s1 = unit("s1", UnitKind::Sector, 1);
    let s2 = unit("s2", UnitKind::Sector, 1);

    // Sector links only; no area-level link was ever computed.
    ledger
        .replace_territory_links(
            "t1",
            UnitKind::Sector,
            vec![link("t1", "s1", 0.5), link("t1", "s2", 0.5)],
        )
        .unwrap();
    let status_map = statuses(&[("t1", TrailStatus::Validated)]);

    let ratio =
        completion_ratio(&ledger, &area, &[&s1, &s2], |id| status_map.get(id).copied()).unwrap();
    assert!((ratio.weighted_count - 1.0).abs() < 1e-9);
    assert_eq!(ratio.raw(), Some(0.5));
}

#[test]
fn non_trail_entities_are_ignored() {
    let ledger = MemoryLedger::new();
    let sector = unit("s1", UnitKind::Sector, 1);
    ledger
        .replace_territory_links("hut-1", UnitKind::Sector, vec![link("hut-1", "s1", 1.0)])
        .unwrap();

    let ratio = completion_ratio(&ledger, &sector, &[], |_| None).unwrap();
    assert_eq!(ratio.weighted_count, 0.0);
}

#[test]
fn zero_expected_count_keeps_the_miscalibration_visible() {
    let ledger = MemoryLedger::new();
    let sector = unit("s1", UnitKind::Sector, 0);
    ledger
        .replace_territory_links("t1", UnitKind::Sector, vec![link("t1", "s1", 1.0)])
        .unwrap();
    let status_map = statuses(&[("t1", TrailStatus::Validated)]);

    let ratio = completion_ratio(&ledger, &sector, &[], |id| status_map.get(id).copied()).unwrap();
    assert_eq!(ratio.display(), 0.0);
    assert_eq!(ratio.raw(), None);
    assert!((ratio.weighted_count - 1.0).abs() < 1e-9);
}
