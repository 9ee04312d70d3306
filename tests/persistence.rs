//! Tests for the SQLite-backed ledger.

#![cfg(feature = "persistence")]

use trailnet::{
    FeatureKind, LinkLedger, ProximityLink, ProximityScope, SqliteLedger, TerritoryLink, UnitKind,
};

fn territory_link(entity: &str, unit: &str, fraction: f64) -> TerritoryLink {
    TerritoryLink {
        entity_id: entity.to_string(),
        unit_id: unit.to_string(),
        fraction,
    }
}

#[test]
fn replace_and_read_back() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    ledger
        .replace_territory_links(
            "t1",
            UnitKind::Sector,
            vec![
                territory_link("t1", "s1", 0.7),
                territory_link("t1", "s2", 0.3),
            ],
        )
        .unwrap();

    let links = ledger.territory_links("t1", UnitKind::Sector).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(ledger.links_into_unit("s1").unwrap().len(), 1);

    ledger
        .replace_territory_links("t1", UnitKind::Sector, vec![territory_link("t1", "s3", 1.0)])
        .unwrap();
    assert!(ledger.links_into_unit("s1").unwrap().is_empty());
    assert_eq!(ledger.all_territory_links("t1").unwrap().len(), 1);
}

#[test]
fn scopes_are_isolated() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let near = ProximityScope::new(FeatureKind::Hut, 10);
    let wide = ProximityScope::new(FeatureKind::Hut, 250);

    ledger
        .replace_proximity_links(
            "t1",
            near,
            vec![ProximityLink {
                entity_id: "t1".to_string(),
                target_id: "hut-1".to_string(),
                radius_m: 10,
                distance_m: 4.0,
            }],
        )
        .unwrap();
    ledger.replace_proximity_links("t1", wide, vec![]).unwrap();

    assert_eq!(ledger.proximity_links("t1", near).unwrap().len(), 1);
    assert!(ledger.proximity_links("t1", wide).unwrap().is_empty());
}

#[test]
fn invalid_batch_rolls_back_to_prior_links() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    ledger
        .replace_territory_links("t1", UnitKind::Sector, vec![territory_link("t1", "s1", 1.0)])
        .unwrap();

    let result = ledger.replace_territory_links(
        "t1",
        UnitKind::Sector,
        vec![
            territory_link("t1", "s2", 0.5),
            territory_link("t1", "s3", 1.5),
        ],
    );
    assert!(result.is_err());

    let links = ledger.territory_links("t1", UnitKind::Sector).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].unit_id, "s1");
}

#[test]
fn links_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("links.db");

    {
        let ledger = SqliteLedger::open(&path).unwrap();
        ledger
            .replace_territory_links(
                "t1",
                UnitKind::Area,
                vec![territory_link("t1", "a1", 1.0)],
            )
            .unwrap();
    }

    let reopened = SqliteLedger::open(&path).unwrap();
    let links = reopened.territory_links("t1", UnitKind::Area).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].unit_id, "a1");
}
