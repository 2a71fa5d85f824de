//! Polygons as ring collections, and the extents rectangle.

use crate::geometry::{Point, Polyline, SegmentHit};

/// Axis-aligned extents rectangle, y increasing upward.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extents {
    pub min: Point,
    pub max: Point,
}

impl Extents {
    /// Creates extents from two opposite corners; the corners are sorted.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Returns the maximally inverted rectangle, ready to gather extents:
    /// growing it to contain any point makes it valid.
    pub fn inside_out() -> Self {
        Self {
            min: Point::new(f64::MAX, f64::MAX),
            max: Point::new(f64::MIN, f64::MIN),
        }
    }

    /// False while the rectangle is still inside out.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }

    /// Tests containment, exclusive of the boundary.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.min.x && p.x < self.max.x && p.y > self.min.y && p.y < self.max.y
    }

    /// Tests whether two rectangles overlap, inclusive of touching edges.
    pub fn overlaps(&self, other: &Extents) -> bool {
        !(self.min.x > other.max.x
            || other.min.x > self.max.x
            || self.min.y > other.max.y
            || other.min.y > self.max.y)
    }

    /// Expands the rectangle outward by `x` and `y` on each side.
    pub fn grow(&mut self, x: f64, y: f64) {
        self.min.x -= x;
        self.max.x += x;
        self.min.y -= y;
        self.max.y += y;
    }

    /// Expands the rectangle to contain `p`.
    pub fn grow_to_contain(&mut self, p: Point) {
        if p.x < self.min.x {
            self.min.x = p.x;
        }
        if p.x > self.max.x {
            self.max.x = p.x;
        }
        if p.y < self.min.y {
            self.min.y = p.y;
        }
        if p.y > self.max.y {
            self.max.y = p.y;
        }
    }

    /// Expands the rectangle to contain all of `other`.
    pub fn grow_to_contain_extents(&mut self, other: Extents) {
        self.grow_to_contain(other.min);
        self.grow_to_contain(other.max);
    }
}

/// A polygon stored as a collection of closed rings.
///
/// Ring 0 is the outer boundary; any subsequent rings are holes. By
/// convention the outer ring winds counter-clockwise and holes wind
/// clockwise; [`fix_winding`](Self::fix_winding) enforces this.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polygon {
    pub rings: Vec<Polyline>,
}

impl Polygon {
    /// Creates a polygon from its rings.
    pub fn new(rings: Vec<Polyline>) -> Self {
        Self { rings }
    }

    /// Creates a polygon with a single outer ring and no holes.
    pub fn from_outer(outer: Polyline) -> Self {
        Self { rings: vec![outer] }
    }

    /// Returns the total number of vertices across all rings.
    pub fn total_vertices(&self) -> usize {
        self.rings.iter().map(|r| r.len()).sum()
    }

    /// Resolves a flat vertex index (counting across rings in order) to
    /// the ring number and the offset within that ring.
    pub fn ring_of_vertex(&self, mut flat: usize) -> Option<(usize, usize)> {
        for (ring, r) in self.rings.iter().enumerate() {
            if flat < r.len() {
                return Some((ring, flat));
            }
            flat -= r.len();
        }
        None
    }

    /// Returns the vertex at a flat index across rings.
    pub fn vertex(&self, flat: usize) -> Option<Point> {
        let (ring, offset) = self.ring_of_vertex(flat)?;
        Some(self.rings[ring].vertices[offset])
    }

    /// Computes the extents over all rings, or `None` for an empty
    /// polygon.
    pub fn compute_extents(&self) -> Option<Extents> {
        let mut rect = Extents::inside_out();
        for ring in &self.rings {
            for &p in &ring.vertices {
                rect.grow_to_contain(p);
            }
        }
        rect.is_valid().then_some(rect)
    }

    /// Tests whether the polygon contains `p`: inside the outer ring and
    /// not inside any hole.
    ///
    /// Known ambiguity: an "island" ring nested inside a hole is treated
    /// like any other hole, so points inside the island report as
    /// outside. This inherited behavior is deliberately preserved rather
    /// than silently redefined.
    pub fn contains_point(&self, p: Point) -> bool {
        match self.rings.split_first() {
            Some((outer, holes)) => {
                outer.contains_point(p) && !holes.iter().any(|h| h.contains_point(p))
            }
            None => false,
        }
    }

    /// Returns the enclosed area as the sum of signed ring areas. Under
    /// the winding convention, holes subtract from the outer ring.
    pub fn area(&self) -> f64 {
        self.rings.iter().map(|r| r.signed_area()).sum()
    }

    /// Returns the index of and distance to the nearest vertex on any
    /// ring, as a flat index across rings.
    pub fn nearest_point(&self, query: Point) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut ring_start = 0;
        for ring in &self.rings {
            if let Some((i, d)) = ring.nearest_point(query) {
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((ring_start + i, d));
                }
            }
            ring_start += ring.len();
        }
        best
    }

    /// Returns the closest point on any ring's segments, with the
    /// segment index flattened across rings.
    pub fn nearest_segment(&self, query: Point) -> Option<SegmentHit> {
        let mut best: Option<SegmentHit> = None;
        let mut ring_start = 0;
        for ring in &self.rings {
            if let Some(hit) = ring.nearest_segment(query) {
                if best.map_or(true, |b| hit.distance < b.distance) {
                    best = Some(SegmentHit {
                        index: ring_start + hit.index,
                        ..hit
                    });
                }
            }
            ring_start += ring.len();
        }
        best
    }

    /// Moves every vertex of every ring by `offset`.
    pub fn translate(&mut self, offset: Point) {
        for ring in &mut self.rings {
            ring.translate(offset);
        }
    }

    /// Scales every vertex of every ring by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for ring in &mut self.rings {
            ring.scale(factor);
        }
    }

    /// Reverses the vertex order of every ring.
    pub fn reverse_order(&mut self) {
        for ring in &mut self.rings {
            ring.reverse();
        }
    }

    /// Inserts `p` after the vertex at a flat index, which may land on
    /// the outer ring or any hole. Panics when the index is out of range.
    pub fn insert_point_after(&mut self, flat: usize, p: Point) {
        let (ring, offset) = self
            .ring_of_vertex(flat)
            .unwrap_or_else(|| panic!("vertex {flat} of {}", self.total_vertices()));
        self.rings[ring].insert_point_after(offset, p);
    }

    /// Removes the vertex at a flat index, which may be on the outer
    /// ring or any hole. Panics when the index is out of range.
    pub fn remove_point(&mut self, flat: usize) -> Point {
        let (ring, offset) = self
            .ring_of_vertex(flat)
            .unwrap_or_else(|| panic!("vertex {flat} of {}", self.total_vertices()));
        self.rings[ring].remove_point(offset)
    }

    /// Removes degenerate (coincident) points from every ring, treating
    /// each ring as closed. Returns the total removed.
    pub fn remove_degenerate_points(&mut self, epsilon: f64) -> usize {
        self.rings
            .iter_mut()
            .map(|r| r.remove_degenerate_points(epsilon, true))
            .sum()
    }

    /// Removes colinear points from every ring, treating each ring as
    /// closed. Returns the total removed.
    pub fn remove_colinear_points(&mut self, epsilon: f64) -> usize {
        self.rings
            .iter_mut()
            .map(|r| r.remove_colinear_points(epsilon, true))
            .sum()
    }

    /// True when the polygon is unusable for containment or meshing:
    /// no rings at all, or any ring reduced below 3 points.
    pub fn is_degenerate(&self) -> bool {
        self.rings.is_empty() || self.rings.iter().any(|r| r.len() < 3)
    }

    /// Forces the conventional winding (outer counter-clockwise, holes
    /// clockwise) by reversing rings as needed. Returns the number of
    /// rings flipped.
    pub fn fix_winding(&mut self) -> usize {
        let mut flipped = 0;
        for (i, ring) in self.rings.iter_mut().enumerate() {
            let area = ring.signed_area();
            let wrong = if i == 0 { area < 0.0 } else { area > 0.0 };
            if wrong {
                ring.reverse();
                flipped += 1;
            }
        }
        flipped
    }
}
