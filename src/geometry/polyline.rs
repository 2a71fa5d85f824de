//! Ordered point sequences and their geometric algorithms.

use crate::geometry::{distance, point_in_ring, Point};

/// Result of a nearest-segment query: the index of the segment's first
/// vertex, the distance to the query point, and the projected point on
/// the segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub index: usize,
    pub distance: f64,
    pub point: Point,
}

/// Representation of a series of connected line segments.
///
/// Whether the sequence is an open path or a closed ring is a convention
/// of the caller, not a stored flag: algorithms that care take a `closed`
/// argument and wrap their index arithmetic accordingly.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true when the polyline has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Moves every vertex by `offset`, in place.
    pub fn translate(&mut self, offset: Point) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Scales every vertex by `factor`, in place.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.vertices {
            *v = *v * factor;
        }
    }

    /// Inserts `p` directly after position `i`.
    ///
    /// Panics when `i` is out of range; an out-of-range index here is a
    /// caller bug, not a recoverable condition.
    pub fn insert_point_after(&mut self, i: usize, p: Point) {
        assert!(i < self.vertices.len(), "insert after {i} of {}", self.vertices.len());
        self.vertices.insert(i + 1, p);
    }

    /// Removes the vertex at `i`. Panics when `i` is out of range.
    pub fn remove_point(&mut self, i: usize) -> Point {
        self.vertices.remove(i)
    }

    /// Reverses the vertex order in place. Used to fix ring winding.
    pub fn reverse(&mut self) {
        self.vertices.reverse();
    }

    /// Returns the vertex at `index`, wrapping once past either end.
    ///
    /// Panics when the index is out of range even after wrapping.
    pub fn safe_point(&self, index: isize) -> Point {
        let n = self.vertices.len() as isize;
        let i = if index < 0 {
            index + n
        } else if index >= n {
            index - n
        } else {
            index
        };
        self.vertices[i as usize]
    }

    /// Returns the length of segment `i`, the distance between vertices
    /// `i` and `i + 1`. The last segment wraps around to the first
    /// vertex (closed semantics).
    pub fn segment_length(&self, i: usize) -> f64 {
        let j = if i < self.vertices.len() - 1 { i + 1 } else { 0 };
        distance(self.vertices[i], self.vertices[j])
    }

    /// Returns the total length of all segments, open-path semantics
    /// (the loop is not closed).
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance(pair[0], pair[1]))
            .sum()
    }

    /// Removes every point closer than `epsilon` to its predecessor.
    ///
    /// Given A B C D where B and C coincide, the result is A B D. When
    /// `closed`, the predecessor of the first point is the last point;
    /// when open, the first and last points are structural endpoints and
    /// are never removed. Returns the number of points removed; calling
    /// again removes nothing.
    pub fn remove_degenerate_points(&mut self, epsilon: f64, closed: bool) -> usize {
        let mut removed = 0;
        let preserve = if closed { 0 } else { 1 };
        let mut i = preserve;
        while i + preserve < self.vertices.len() {
            let prev = self.safe_point(i as isize - 1);
            if distance(self.vertices[i], prev) < epsilon {
                self.vertices.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Removes every point whose perpendicular distance to the line
    /// through its two neighbors is below `epsilon`.
    ///
    /// Given A B C where B lies within `epsilon` of the line A-C, the
    /// result is A C. Endpoint handling matches
    /// [`remove_degenerate_points`](Self::remove_degenerate_points).
    pub fn remove_colinear_points(&mut self, epsilon: f64, closed: bool) -> usize {
        let mut removed = 0;
        let preserve = if closed { 0 } else { 1 };
        let mut i = preserve;
        while i + preserve < self.vertices.len() {
            let prev = self.safe_point(i as isize - 1);
            let next = self.safe_point(i as isize + 1);
            let ray = (next - prev).normalized();
            if ray == Point::ZERO {
                // Coincident neighbors leave no line to measure against.
                i += 1;
                continue;
            }
            let dist = ray.cross(self.vertices[i] - prev);
            if dist.abs() < epsilon {
                self.vertices.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Returns the index of and distance to the vertex nearest to
    /// `query`, scanning vertices only. The closest place on the line
    /// may lie between vertices; use
    /// [`nearest_segment`](Self::nearest_segment) for that.
    pub fn nearest_point(&self, query: Point) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = distance(query, *v);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best
    }

    /// Returns the closest point on the polyline to `query`.
    ///
    /// Each segment (including the wrap-around segment from the last
    /// vertex back to the first) is considered only when the
    /// perpendicular foot of the query lies within it, i.e. the
    /// parametric projection u falls in [0, 1]. Returns `None` when no
    /// segment qualifies.
    pub fn nearest_segment(&self, query: Point) -> Option<SegmentHit> {
        let n = self.vertices.len();
        let mut best: Option<SegmentHit> = None;
        for i in 0..n {
            let p0 = self.vertices[i];
            let p1 = self.vertices[(i + 1) % n];
            let mag = self.segment_length(i);
            if mag <= 0.0 {
                continue;
            }
            let u = (query - p0).dot(p1 - p0) / (mag * mag);
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let proj = p0 + (p1 - p0) * u;
            let d = distance(query, proj);
            if best.map_or(true, |b| d < b.distance) {
                best = Some(SegmentHit {
                    index: i,
                    distance: d,
                    point: proj,
                });
            }
        }
        best
    }

    /// Tests whether a point lies inside these vertices interpreted as a
    /// closed simple polygon (concave or convex, no holes).
    pub fn contains_point(&self, p: Point) -> bool {
        point_in_ring(&self.vertices, p)
    }

    /// Returns the area-weighted centroid (center of mass) of the
    /// vertices interpreted as a closed polygon.
    ///
    /// Known precision issue: with coordinates of large magnitude
    /// relative to the polygon size (7-digit projected coordinates, for
    /// example) the result can drift by several units, even outside a
    /// convex polygon. Translate to a local origin first in that case.
    pub fn centroid(&self) -> Point {
        let n = self.vertices.len();
        let mut pt = Point::ZERO;
        let mut sum = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            let t = self.vertices[i].x * self.vertices[j].y - self.vertices[j].x * self.vertices[i].y;
            pt.x += (self.vertices[i].x + self.vertices[j].x) * t;
            pt.y += (self.vertices[i].y + self.vertices[j].y) * t;
            sum += t;
        }
        let d = 3.0 * sum;
        Point::new(pt.x / d, pt.y / d)
    }

    /// Returns the approximate centroid obtained by averaging the
    /// vertices. Cheap, but weighted toward densely sampled stretches;
    /// not interchangeable with [`centroid`](Self::centroid).
    pub fn centroid_approx(&self) -> Point {
        let n = self.vertices.len();
        let mut result = Point::ZERO;
        for v in &self.vertices {
            result += *v;
        }
        result / n as f64
    }

    /// Returns the signed shoelace area of the vertices interpreted as a
    /// closed ring: positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            sum += self.vertices[i].x * self.vertices[j].y - self.vertices[j].x * self.vertices[i].y;
        }
        sum * 0.5
    }

    /// Tests convexity of the vertices interpreted as a closed ring, by
    /// checking that all turns share one sign.
    pub fn is_convex(&self) -> bool {
        let mut positive = 0;
        let mut negative = 0;
        for i in 0..self.vertices.len() {
            let p0 = self.vertices[i];
            let p1 = self.safe_point(i as isize + 1);
            let p2 = self.safe_point(i as isize + 2);
            let cross = (p1 - p0).cross(p2 - p1);
            if cross < 0.0 {
                negative += 1;
            } else {
                positive += 1;
            }
        }
        negative == 0 || positive == 0
    }
}
