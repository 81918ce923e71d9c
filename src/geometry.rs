//! Hazard-zone geometry: points, polygons and containment tests.
//!
//! Geometries arrive from the hazard source in GeoJSON layout (positions are
//! `[lon, lat]`). Containment uses the even-odd ray-casting rule per ring;
//! a point on a ring edge classifies however the crossing formula falls.

use serde::{Deserialize, Serialize};

/// A geographic coordinate. Serialized as a `[lon, lat]` position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Point {
    fn from(position: [f64; 2]) -> Self {
        Self {
            lon: position[0],
            lat: position[1],
        }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.lon, point.lat]
    }
}

/// A closed ring of positions. First ring of a polygon is the outer
/// boundary, subsequent rings are holes.
pub type Ring = Vec<Point>;

/// Polygon or multi-polygon geometry in GeoJSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Even-odd containment test honoring holes.
    ///
    /// A point is inside a polygon iff it is inside the outer ring and
    /// inside none of the hole rings; inside a multi-polygon iff inside any
    /// constituent polygon. Pure function, stable under re-evaluation.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Geometry::Polygon(rings) => point_in_polygon(point, rings),
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().any(|rings| point_in_polygon(point, rings))
            }
        }
    }

    /// True when the geometry carries no usable outer ring.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Polygon(rings) => rings.first().map_or(true, |ring| ring.len() < 3),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .all(|rings| rings.first().map_or(true, |ring| ring.len() < 3)),
        }
    }
}

fn point_in_polygon(point: Point, rings: &[Ring]) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if !point_in_ring(point, outer) {
        return false;
    }
    !rings[1..].iter().any(|hole| point_in_ring(point, hole))
}

/// Ray casting against a single ring. Works on open or closed rings (a
/// repeated last vertex contributes no extra crossing).
fn point_in_ring(point: Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (point.lon, point.lat);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Ring> {
        vec![vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(0.0, 0.0),
        ]]
    }

    #[test]
    fn test_point_inside_square() {
        let geometry = Geometry::Polygon(square());
        assert!(geometry.contains(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_point_outside_square() {
        let geometry = Geometry::Polygon(square());
        assert!(!geometry.contains(Point::new(5.0, 5.0)));
        assert!(!geometry.contains(Point::new(-1.0, 1.0)));
    }

    #[test]
    fn test_hole_excludes_point() {
        let mut rings = square();
        rings.push(vec![
            Point::new(0.5, 0.5),
            Point::new(1.5, 0.5),
            Point::new(1.5, 1.5),
            Point::new(0.5, 1.5),
            Point::new(0.5, 0.5),
        ]);
        let geometry = Geometry::Polygon(rings);

        assert!(!geometry.contains(Point::new(1.0, 1.0)), "inside the hole");
        assert!(
            geometry.contains(Point::new(0.25, 0.25)),
            "between outer ring and hole"
        );
    }

    #[test]
    fn test_multipolygon_any_member() {
        let far_square = vec![vec![
            Point::new(10.0, 10.0),
            Point::new(12.0, 10.0),
            Point::new(12.0, 12.0),
            Point::new(10.0, 12.0),
            Point::new(10.0, 10.0),
        ]];
        let geometry = Geometry::MultiPolygon(vec![square(), far_square]);

        assert!(geometry.contains(Point::new(1.0, 1.0)));
        assert!(geometry.contains(Point::new(11.0, 11.0)));
        assert!(!geometry.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_classification_is_stable() {
        let geometry = Geometry::Polygon(square());
        let point = Point::new(1.3, 0.7);
        let first = geometry.contains(point);
        for _ in 0..10 {
            assert_eq!(geometry.contains(point), first);
        }
    }

    #[test]
    fn test_degenerate_ring_contains_nothing() {
        let geometry = Geometry::Polygon(vec![vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]]);
        assert!(!geometry.contains(Point::new(0.5, 0.5)));
        assert!(geometry.is_empty());
    }

    #[test]
    fn test_geojson_round_layout() {
        let json = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[2.0,0.0],[2.0,2.0],[0.0,2.0],[0.0,0.0]]]}"#;
        let geometry: Geometry = serde_json::from_str(json).expect("parse polygon");
        assert!(geometry.contains(Point::new(1.0, 1.0)));
    }
}
