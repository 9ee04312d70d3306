//! Geographic utilities shared by the computation engines.
//!
//! All coordinates are SRID 4326 (longitude/latitude degrees). Lengths and
//! distances are meters: haversine for along-track lengths, ellipsoidal
//! (WGS84 geodesic) for point-to-point distances used in buffered proximity.

use geo::{
    BoundingRect, Closest, ClosestPoint, GeodesicDistance, HaversineLength, Intersects,
    MultiLineString, MultiPolygon, Point,
};
use serde::{Deserialize, Serialize};

use crate::model::TerritoryGeometry;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Compute the bounding box of a geometry.
    ///
    /// Returns `None` for empty geometries.
    pub fn of_geometry(geometry: &TerritoryGeometry) -> Option<Self> {
        let rect = geometry.to_geometry().bounding_rect()?;
        Some(Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Center point of the bounds.
    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Grow the bounds by a metric buffer on every side.
    ///
    /// The longitude growth is scaled by the latitude of the box center so
    /// the buffer stays roughly metric away from the equator.
    pub fn expanded_by_meters(&self, buffer_m: f64) -> Self {
        let lat = (self.min_lat + self.max_lat) / 2.0;
        let d_lat = buffer_m / METERS_PER_DEGREE;
        let d_lng = meters_to_degrees(buffer_m, lat);
        Self {
            min_lat: self.min_lat - d_lat,
            max_lat: self.max_lat + d_lat,
            min_lng: self.min_lng - d_lng,
            max_lng: self.max_lng + d_lng,
        }
    }
}

/// Convert a metric distance to degrees of longitude at the given latitude.
pub fn meters_to_degrees(meters: f64, at_latitude: f64) -> f64 {
    let shrink = at_latitude.to_radians().cos().abs().max(1e-6);
    meters / (METERS_PER_DEGREE * shrink)
}

/// Ellipsoidal (WGS84) distance between two points in meters.
pub fn geodesic_distance(a: &Point<f64>, b: &Point<f64>) -> f64 {
    a.geodesic_distance(b)
}

/// Length of a line in meters (haversine, segment by segment).
pub fn line_length_m(line: &MultiLineString<f64>) -> f64 {
    line.haversine_length()
}

/// Minimum ellipsoidal distance between two geometries in meters.
///
/// Zero when the geometries intersect. Returns `None` when either geometry
/// has no coordinates. For non-intersecting geometries the minimum is taken
/// over each geometry's vertices projected onto the other, which is exact
/// for point targets and accurate to segment-projection error otherwise.
pub fn min_geodesic_distance(a: &TerritoryGeometry, b: &TerritoryGeometry) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a.to_geometry().intersects(&b.to_geometry()) {
        return Some(0.0);
    }

    let mut min = f64::INFINITY;
    for v in a.vertices() {
        if let Some(p) = closest_point_on(b, &v) {
            min = min.min(v.geodesic_distance(&p));
        }
    }
    for v in b.vertices() {
        if let Some(p) = closest_point_on(a, &v) {
            min = min.min(v.geodesic_distance(&p));
        }
    }

    if min.is_finite() {
        Some(min)
    } else {
        None
    }
}

/// Closest point on a geometry to the given point.
fn closest_point_on(target: &TerritoryGeometry, from: &Point<f64>) -> Option<Point<f64>> {
    let closest = match target {
        TerritoryGeometry::Point(p) => return Some(*p),
        TerritoryGeometry::Line(line) => line.closest_point(from),
        TerritoryGeometry::Polygon(polygon) => closest_on_polygon(polygon, from),
    };
    match closest {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p),
        Closest::Indeterminate => None,
    }
}

fn closest_on_polygon(polygon: &MultiPolygon<f64>, from: &Point<f64>) -> Closest<f64> {
    // Intersecting geometries are handled before projection, so only the
    // boundary rings matter here.
    let mut best = Closest::Indeterminate;
    let mut best_dist = f64::INFINITY;
    for poly in polygon {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            match ring.closest_point(from) {
                Closest::Intersection(p) => return Closest::Intersection(p),
                Closest::SinglePoint(p) => {
                    let d = from.geodesic_distance(&p);
                    if d < best_dist {
                        best_dist = d;
                        best = Closest::SinglePoint(p);
                    }
                }
                Closest::Indeterminate => {}
            }
        }
    }
    best
}
