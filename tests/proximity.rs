//! Tests for the buffered proximity matcher.

use geo::{LineString, MultiLineString, Point};
use trailnet::{compute_proximity_links, within_buffer, TerritoryGeometry};

/// Meters per degree of longitude along the equator (WGS84).
const METERS_PER_LNG_DEGREE: f64 = 111_319.49;

fn equator_line() -> TerritoryGeometry {
    TerritoryGeometry::Line(MultiLineString::new(vec![LineString::from(vec![
        (0.0, 0.0),
        (0.01, 0.0),
    ])]))
}

fn point_target(lng: f64, lat: f64) -> TerritoryGeometry {
    TerritoryGeometry::Point(Point::new(lng, lat))
}

#[test]
fn buffer_boundary_is_inclusive() {
    assert!(within_buffer(250.0, 250));
    assert!(!within_buffer(250.0 + 1e-6, 250));
}

#[test]
fn target_inside_buffer_is_linked_with_measured_distance() {
    let reference = equator_line();
    // ~222.6 m east of the line's end vertex.
    let target = point_target(0.01 + 222.0 / METERS_PER_LNG_DEGREE, 0.0);
    let targets = [("hut-1", &target)];

    let links = compute_proximity_links(
        "trail-1",
        Some(&reference),
        targets.iter().map(|(id, g)| (*id, *g)),
        250,
    )
    .unwrap();

    assert_eq!(links.len(), 1);
    let link = &links[0];
    assert_eq!(link.target_id, "hut-1");
    assert_eq!(link.radius_m, 250);
    assert!(
        (link.distance_m - 222.0).abs() < 2.0,
        "distance was {}",
        link.distance_m
    );
}

#[test]
fn target_beyond_buffer_is_excluded() {
    let reference = equator_line();
    let target = point_target(0.01 + 300.0 / METERS_PER_LNG_DEGREE, 0.0);
    let targets = [("hut-1", &target)];

    let links = compute_proximity_links(
        "trail-1",
        Some(&reference),
        targets.iter().map(|(id, g)| (*id, *g)),
        250,
    )
    .unwrap();
    assert!(links.is_empty());
}

#[test]
fn distance_is_measured_to_the_segment_not_the_vertices() {
    let reference = equator_line();
    // Sits halfway along the line, ~111 m north: far from both endpoints,
    // close to the segment.
    let target = point_target(0.005, 0.001);
    let targets = [("spring-1", &target)];

    let links = compute_proximity_links(
        "trail-1",
        Some(&reference),
        targets.iter().map(|(id, g)| (*id, *g)),
        150,
    )
    .unwrap();

    assert_eq!(links.len(), 1);
    assert!(
        (links[0].distance_m - 111.0).abs() < 2.0,
        "distance was {}",
        links[0].distance_m
    );
}

#[test]
fn touching_geometry_has_zero_distance() {
    let reference = equator_line();
    let target = point_target(0.005, 0.0);
    let targets = [("poi-1", &target)];

    let links = compute_proximity_links(
        "trail-1",
        Some(&reference),
        targets.iter().map(|(id, g)| (*id, *g)),
        10,
    )
    .unwrap();

    assert_eq!(links.len(), 1);
    assert!(links[0].distance_m.abs() < 1e-6);
}

#[test]
fn absent_reference_geometry_yields_empty() {
    let target = point_target(0.0, 0.0);
    let targets = [("hut-1", &target)];

    let links =
        compute_proximity_links("trail-1", None, targets.iter().map(|(id, g)| (*id, *g)), 250)
            .unwrap();
    assert!(links.is_empty());
}

#[test]
fn the_entity_never_links_to_itself() {
    let reference = point_target(0.0, 0.0);
    let same = point_target(0.0, 0.0);
    let targets = [("trail-1", &same)];

    let links = compute_proximity_links(
        "trail-1",
        Some(&reference),
        targets.iter().map(|(id, g)| (*id, *g)),
        250,
    )
    .unwrap();
    assert!(links.is_empty());
}
