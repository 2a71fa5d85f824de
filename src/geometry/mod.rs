//! Geometry primitives and predicates for terrain processing.

mod point;
mod polygon;
mod polyline;

pub use point::{Point, Point3, Point3f};
pub use polygon::{Extents, Polygon};
pub use polyline::{Polyline, SegmentHit};

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Calculates the Euclidean distance between two 3D points.
pub fn distance3(a: Point3, b: Point3) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2) + (b.z - a.z).powi(2)).sqrt()
}

/// Tests whether a point lies inside the closed ring described by
/// `ring`, by counting the parity of crossings of a +X ray against the
/// ring's edges. Handles concave and convex simple rings; holes are the
/// caller's concern.
pub fn point_in_ring(ring: &[Point], p: Point) -> bool {
    if ring.is_empty() {
        return false;
    }
    let mut inside = false;
    let mut v0 = ring[ring.len() - 1];
    let mut yflag0 = v0.y >= p.y;
    for &v1 in ring {
        let yflag1 = v1.y >= p.y;
        // Only edges straddling the horizontal through p can cross the ray.
        if yflag0 != yflag1 {
            let xflag0 = v0.x >= p.x;
            if xflag0 == (v1.x >= p.x) {
                // Both endpoints on the same side: crosses only if to the right.
                if xflag0 {
                    inside = !inside;
                }
            } else if v1.x - (v1.y - p.y) * (v0.x - v1.x) / (v0.y - v1.y) >= p.x {
                inside = !inside;
            }
        }
        yflag0 = yflag1;
        v0 = v1;
    }
    inside
}

/// Tests whether `p` lies inside or on the edge of triangle `p1 p2 p3`,
/// in either winding.
pub fn point_in_triangle(p: Point, p1: Point, p2: Point, p3: Point) -> bool {
    let ab = (p.y - p1.y) * (p2.x - p1.x) - (p.x - p1.x) * (p2.y - p1.y);
    let bc = (p.y - p2.y) * (p3.x - p2.x) - (p.x - p2.x) * (p3.y - p2.y);
    let ca = (p.y - p3.y) * (p1.x - p3.x) - (p.x - p3.x) * (p1.y - p3.y);
    ab * bc >= 0.0 && bc * ca >= 0.0 && ab * ca >= 0.0
}

/// Computes the barycentric coordinates of `p` in triangle `p1 p2 p3`.
/// Returns `None` for a degenerate triangle.
pub fn barycentric(p1: Point, p2: Point, p3: Point, p: Point) -> Option<(f64, f64, f64)> {
    let v13 = p1 - p3;
    let v23 = p2 - p3;
    let vp3 = p - p3;
    let m11 = v13.dot(v13);
    let m12 = v13.dot(v23);
    let m22 = v23.dot(v23);
    let r0 = v13.dot(vp3);
    let r1 = v23.dot(vp3);
    let det = m11 * m22 - m12 * m12;
    if det == 0.0 {
        return None;
    }
    let u = (m22 * r0 - m12 * r1) / det;
    let v = (m11 * r1 - m12 * r0) / det;
    Some((u, v, 1.0 - u - v))
}

/// Calculates the area of the triangle `a b c`.
pub fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)).abs() / 2.0
}

/// Calculates the area of the 3D triangle `a b c`.
pub fn triangle_area3(a: Point3, b: Point3, c: Point3) -> f64 {
    (b - a).cross(c - a).length() * 0.5
}
