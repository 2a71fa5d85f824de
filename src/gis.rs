//! Conversions between the crate's geometry and the `geo-types`
//! representation used at import and export boundaries.
//!
//! The crate keeps its own polygon model internally; external geometry
//! only ever appears here. Ring closure differs between the two: a
//! `geo_types` polygon ring repeats its first coordinate at the end,
//! our rings do not, so the converters close and unclose as they go.

use geo_types::{coord, Coord, LineString};

use crate::geometry::{Point, Polygon, Polyline};

/// Tagged union over the geometry types the crate can exchange.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Geometry {
    Point(Point),
    Polyline(Polyline),
    Polygon(Polygon),
}

impl Geometry {
    pub fn to_geo(&self) -> geo_types::Geometry<f64> {
        match self {
            Geometry::Point(p) => geo_types::Geometry::Point(point_to_geo(*p)),
            Geometry::Polyline(line) => geo_types::Geometry::LineString(polyline_to_geo(line)),
            Geometry::Polygon(polygon) => geo_types::Geometry::Polygon(polygon_to_geo(polygon)),
        }
    }

    /// Converts a `geo_types` geometry, flattening rectangles and
    /// triangles into polygons. Multi-part geometries are not
    /// representable and yield `None`.
    pub fn from_geo(geometry: &geo_types::Geometry<f64>) -> Option<Geometry> {
        match geometry {
            geo_types::Geometry::Point(p) => Some(Geometry::Point(point_from_geo(p))),
            geo_types::Geometry::Line(line) => Some(Geometry::Polyline(Polyline::new(vec![
                Point::new(line.start.x, line.start.y),
                Point::new(line.end.x, line.end.y),
            ]))),
            geo_types::Geometry::LineString(line) => {
                Some(Geometry::Polyline(polyline_from_geo(line)))
            }
            geo_types::Geometry::Polygon(polygon) => {
                Some(Geometry::Polygon(polygon_from_geo(polygon)))
            }
            geo_types::Geometry::Rect(rect) => {
                Some(Geometry::Polygon(polygon_from_geo(&rect.to_polygon())))
            }
            geo_types::Geometry::Triangle(triangle) => {
                Some(Geometry::Polygon(polygon_from_geo(&triangle.to_polygon())))
            }
            _ => None,
        }
    }
}

pub fn point_to_geo(p: Point) -> geo_types::Point<f64> {
    geo_types::Point::new(p.x, p.y)
}

pub fn point_from_geo(p: &geo_types::Point<f64>) -> Point {
    Point::new(p.x(), p.y())
}

/// Converts an open path; no ring closure is applied.
pub fn polyline_to_geo(line: &Polyline) -> LineString<f64> {
    LineString::new(
        line.vertices
            .iter()
            .map(|v| coord! { x: v.x, y: v.y })
            .collect(),
    )
}

/// Converts an open path; no ring closure is removed.
pub fn polyline_from_geo(line: &LineString<f64>) -> Polyline {
    Polyline::new(line.coords().map(|c| Point::new(c.x, c.y)).collect())
}

pub fn polygon_to_geo(polygon: &Polygon) -> geo_types::Polygon<f64> {
    let mut rings = polygon.rings.iter().map(ring_to_geo);
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    geo_types::Polygon::new(exterior, rings.collect())
}

pub fn polygon_from_geo(polygon: &geo_types::Polygon<f64>) -> Polygon {
    let exterior = ring_from_geo(polygon.exterior());
    if exterior.is_empty() {
        return Polygon::new(Vec::new());
    }
    let mut rings = vec![exterior];
    rings.extend(polygon.interiors().iter().map(ring_from_geo));
    Polygon::new(rings)
}

fn ring_to_geo(ring: &Polyline) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .vertices
        .iter()
        .map(|v| coord! { x: v.x, y: v.y })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

fn ring_from_geo(ring: &LineString<f64>) -> Polyline {
    let mut vertices: Vec<Point> = ring.coords().map(|c| Point::new(c.x, c.y)).collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    Polyline::new(vertices)
}
