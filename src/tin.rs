//! Triangulated irregular networks built from elevation grids, point
//! clouds or polygon features.

use std::collections::{HashMap, HashSet};
use std::mem::size_of;

use log::{debug, info, warn};
use thiserror::Error;

use crate::features::PolygonSet;
use crate::geometry::{
    barycentric, distance, point_in_ring, point_in_triangle, triangle_area, triangle_area3,
    Extents, Point, Point3, Point3f,
};
use crate::grid::{ElevationSource, NO_DATA};

/// Errors from TIN construction.
#[derive(Debug, Error)]
pub enum TinError {
    /// Triangulation needs at least 3 points.
    #[error("cannot triangulate {0} points, need at least 3")]
    TooFewPoints(usize),
    /// The input produced no triangles at all, typically because every
    /// point is collinear.
    #[error("triangulation produced no triangles")]
    NoTriangles,
    /// The constrained triangulator rejected a polygon feature.
    #[error("cannot triangulate polygon feature {feature}")]
    PolygonTriangulation {
        feature: usize,
        #[source]
        source: cdt::Error,
    },
}

/// Where per-feature heights come from when building a TIN from
/// polygon features.
#[derive(Debug, Clone, PartialEq)]
pub enum HeightSource {
    /// One fixed height for every feature.
    Constant(f32),
    /// Read the named numeric attribute of each feature.
    Field(String),
}

/// Bucket grid over triangle bounding boxes, for fast point location.
#[derive(Debug, Clone)]
struct TriangleBins {
    resolution: usize,
    base: Point,
    step: Point,
    bins: Vec<Vec<usize>>,
}

impl TriangleBins {
    fn build(resolution: usize, tin: &Tin) -> Option<Self> {
        assert!(resolution > 0, "bins need at least one cell");
        let mut rect = tin.extents?;
        // Grow slightly to keep the outermost vertices off the border.
        rect.grow(0.001, 0.001);
        let base = rect.min;
        let step = Point::new(
            rect.width() / resolution as f64,
            rect.height() / resolution as f64,
        );
        let mut bins = vec![Vec::new(); resolution * resolution];
        for (i, &[v0, v1, v2]) in tin.triangles.iter().enumerate() {
            let p1 = tin.vertices[v0];
            let p2 = tin.vertices[v1];
            let p3 = tin.vertices[v2];
            let min_x = p1.x.min(p2.x).min(p3.x);
            let max_x = p1.x.max(p2.x).max(p3.x);
            let min_y = p1.y.min(p2.y).min(p3.y);
            let max_y = p1.y.max(p2.y).max(p3.y);
            let x1 = ((min_x - base.x) / step.x) as usize;
            let x2 = (((max_x - base.x) / step.x) as usize).min(resolution - 1);
            let y1 = ((min_y - base.y) / step.y) as usize;
            let y2 = (((max_y - base.y) / step.y) as usize).min(resolution - 1);
            for x in x1..=x2 {
                for y in y1..=y2 {
                    bins[x * resolution + y].push(i);
                }
            }
        }
        Some(Self {
            resolution,
            base,
            step,
            bins,
        })
    }

    fn candidates(&self, p: Point) -> Option<&[usize]> {
        let x = ((p.x - self.base.x) / self.step.x).floor();
        let y = ((p.y - self.base.y) / self.step.y).floor();
        if x < 0.0 || x >= self.resolution as f64 || y < 0.0 || y >= self.resolution as f64 {
            return None;
        }
        Some(&self.bins[x as usize * self.resolution + y as usize])
    }

    fn memory_used(&self) -> usize {
        let mut bytes = size_of::<Self>() + self.bins.len() * size_of::<Vec<usize>>();
        for bin in &self.bins {
            bytes += bin.len() * size_of::<usize>();
        }
        bytes
    }
}

/// An indexed triangle mesh: 2D vertices with single-precision heights,
/// and triangles as index triples into the vertex list.
///
/// Accelerating caches (per-triangle max edge lengths, the unique-edge
/// outline, triangle bins) are built on demand and dropped whenever the
/// triangle topology or the vertex positions change; height-only
/// transforms keep them. Extents are recomputed by the builders,
/// compaction passes and transforms; after building a mesh by hand with
/// [`add_vertex`](Self::add_vertex) and
/// [`add_triangle`](Self::add_triangle), call
/// [`compute_extents`](Self::compute_extents) yourself.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Tin {
    vertices: Vec<Point>,
    heights: Vec<f32>,
    triangles: Vec<[usize; 3]>,
    extents: Option<Extents>,
    min_height: f32,
    max_height: f32,
    #[serde(skip)]
    edge_len: Option<Vec<f64>>,
    #[serde(skip)]
    outline: Option<HashSet<(usize, usize)>>,
    #[serde(skip)]
    bins: Option<TriangleBins>,
}

impl Tin {
    /// Creates an empty TIN.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a TIN from a grid by triangulating its valid samples.
    ///
    /// Every 2x2 cell contributes two triangles when all four corners
    /// carry valid data, one when exactly three do, and nothing
    /// otherwise. Grid posts left without a triangle are compacted away
    /// before returning.
    pub fn from_grid(grid: &impl ElevationSource) -> Tin {
        let (cols, rows) = grid.dimensions();
        let mut tin = Tin::new();

        // Naively add a vertex for every grid post; the unused ones are
        // removed at the end.
        for x in 0..cols {
            for y in 0..rows {
                tin.add_vertex(grid.world_point(x, y), grid.value(x, y));
            }
        }
        for x in 0..cols.saturating_sub(1) {
            for y in 0..rows.saturating_sub(1) {
                let base = x * rows + y;

                // Only add triangles where the corner posts hold data.
                let b1 = grid.value(x, y) != NO_DATA;
                let b2 = grid.value(x + 1, y) != NO_DATA;
                let b3 = grid.value(x, y + 1) != NO_DATA;
                let b4 = grid.value(x + 1, y + 1) != NO_DATA;
                let valid = b1 as u8 + b2 as u8 + b3 as u8 + b4 as u8;
                if valid < 3 {
                    continue;
                } else if valid == 4 {
                    // Both triangles, on a fixed diagonal.
                    tin.add_triangle(base, base + rows, base + 1);
                    tin.add_triangle(base + 1, base + rows, base + rows + 1);
                } else if !b1 {
                    tin.add_triangle(base + rows, base + rows + 1, base + 1);
                } else if !b2 {
                    tin.add_triangle(base + rows + 1, base + 1, base);
                } else if !b3 {
                    tin.add_triangle(base, base + rows, base + rows + 1);
                } else {
                    tin.add_triangle(base + rows, base + 1, base);
                }
            }
        }

        let dropped = tin.remove_unused_vertices();
        debug!(
            "grid tin: {} vertices, {} triangles, {dropped} posts dropped",
            tin.num_verts(),
            tin.num_tris()
        );
        tin
    }

    /// Builds a TIN from 3D points using Delaunay triangulation on the
    /// XY plane.
    pub fn from_point_cloud(points: &[Point3]) -> Result<Tin, TinError> {
        if points.len() < 3 {
            return Err(TinError::TooFewPoints(points.len()));
        }
        let coords: Vec<delaunator::Point> = points
            .iter()
            .map(|p| delaunator::Point { x: p.x, y: p.y })
            .collect();
        let triangulation = delaunator::triangulate(&coords);
        if triangulation.triangles.is_empty() {
            return Err(TinError::NoTriangles);
        }
        let mut tin = Tin::new();
        for p in points {
            tin.add_vertex(p.xy(), p.z as f32);
        }
        for c in triangulation.triangles.chunks(3) {
            tin.add_triangle(c[0], c[1], c[2]);
        }
        tin.compute_extents();
        debug!(
            "point cloud tin: {} vertices, {} triangles",
            tin.num_verts(),
            tin.num_tris()
        );
        Ok(tin)
    }

    /// Builds a TIN by triangulating each polygon feature as a flat
    /// surface at its resolved height.
    ///
    /// Features whose height cannot be resolved or whose outer ring is
    /// degenerate are skipped with a warning; degenerate hole rings are
    /// dropped individually. A triangulator failure on well-formed
    /// input aborts the build.
    pub fn from_polygon_features(
        set: &PolygonSet,
        heights: &HeightSource,
    ) -> Result<Tin, TinError> {
        let mut tin = Tin::new();
        let mut skipped = 0;
        for (i, feature) in set.iter().enumerate() {
            let z = match heights {
                HeightSource::Constant(z) => *z,
                HeightSource::Field(name) => match feature.numeric_field(name) {
                    Some(v) => v as f32,
                    None => {
                        warn!("feature {i} has no numeric '{name}' attribute, skipped");
                        skipped += 1;
                        continue;
                    }
                },
            };
            let outer = match feature.polygon.rings.first() {
                Some(ring) if ring.len() >= 3 => ring,
                _ => {
                    warn!("feature {i} has a degenerate outer ring, skipped");
                    skipped += 1;
                    continue;
                }
            };
            let holes: Vec<_> = feature.polygon.rings[1..]
                .iter()
                .filter(|ring| {
                    if ring.len() < 3 {
                        warn!("feature {i} has a degenerate hole ring, dropped");
                    }
                    ring.len() >= 3
                })
                .collect();

            // Constrain every ring edge, then triangulate the whole
            // vertex set at once.
            let mut coords: Vec<(f64, f64)> = Vec::new();
            let mut edges: Vec<(usize, usize)> = Vec::new();
            for ring in std::iter::once(outer).chain(holes.iter().copied()) {
                let start = coords.len();
                for v in &ring.vertices {
                    coords.push((v.x, v.y));
                }
                for k in start..coords.len() - 1 {
                    edges.push((k, k + 1));
                }
                edges.push((coords.len() - 1, start));
            }
            let tris = cdt::triangulate_with_edges(&coords, &edges)
                .map_err(|source| TinError::PolygonTriangulation { feature: i, source })?;

            let base = tin.num_verts();
            for &(x, y) in &coords {
                tin.add_vertex(Point::new(x, y), z);
            }
            for (a, b, c) in tris {
                // The triangulator covers the full hull; keep only
                // triangles whose centroid lies in the feature itself,
                // which drops hole fills and pockets.
                let cx = (coords[a].0 + coords[b].0 + coords[c].0) / 3.0;
                let cy = (coords[a].1 + coords[b].1 + coords[c].1) / 3.0;
                let centroid = Point::new(cx, cy);
                let inside = point_in_ring(&outer.vertices, centroid)
                    && !holes.iter().any(|h| point_in_ring(&h.vertices, centroid));
                if inside {
                    tin.add_triangle(base + a, base + b, base + c);
                }
            }
        }
        tin.compute_extents();
        debug!(
            "polygon tin: {} features in, {skipped} skipped, {} triangles",
            set.len(),
            tin.num_tris()
        );
        Ok(tin)
    }

    /// Returns the number of vertices.
    pub fn num_verts(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of triangles.
    pub fn num_tris(&self) -> usize {
        self.triangles.len()
    }

    /// True when the TIN holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the vertex at `i`.
    pub fn vertex(&self, i: usize) -> Point {
        self.vertices[i]
    }

    /// Returns the height of vertex `i`.
    pub fn height(&self, i: usize) -> f32 {
        self.heights[i]
    }

    /// Returns the vertex indices of triangle `i`.
    pub fn triangle(&self, i: usize) -> [usize; 3] {
        self.triangles[i]
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Appends a vertex and returns its index. Does not touch the
    /// caches or extents.
    pub fn add_vertex(&mut self, p: Point, z: f32) -> usize {
        self.vertices.push(p);
        self.heights.push(z);
        self.vertices.len() - 1
    }

    /// Appends a triangle. Panics when an index is out of range.
    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) {
        let n = self.vertices.len();
        assert!(
            v0 < n && v1 < n && v2 < n,
            "triangle ({v0} {v1} {v2}) out of range for {n} vertices"
        );
        self.triangles.push([v0, v1, v2]);
        self.invalidate_caches();
    }

    /// Removes vertex `i`, drops every triangle referencing it, and
    /// renumbers the indices above it. Panics when out of range.
    pub fn remove_vertex(&mut self, i: usize) {
        assert!(i < self.vertices.len(), "vertex {i} out of range");
        self.vertices.remove(i);
        self.heights.remove(i);
        self.triangles.retain(|t| !t.contains(&i));
        for tri in &mut self.triangles {
            for v in tri.iter_mut() {
                if *v > i {
                    *v -= 1;
                }
            }
        }
        self.invalidate_caches();
        self.compute_extents();
    }

    /// Removes every vertex no triangle refers to, renumbering the
    /// triangle indices. Returns the number removed.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for tri in &self.triangles {
            for &v in tri {
                used[v] = true;
            }
        }
        let mut remap = vec![0usize; self.vertices.len()];
        let mut next = 0;
        for (i, &keep) in used.iter().enumerate() {
            if keep {
                remap[i] = next;
                self.vertices[next] = self.vertices[i];
                self.heights[next] = self.heights[i];
                next += 1;
            }
        }
        let removed = self.vertices.len() - next;
        if removed > 0 {
            self.vertices.truncate(next);
            self.heights.truncate(next);
            for tri in &mut self.triangles {
                for v in tri.iter_mut() {
                    *v = remap[*v];
                }
            }
            self.invalidate_caches();
        }
        self.compute_extents();
        removed
    }

    /// Welds vertices with bit-identical coordinates into one, keeping
    /// the first occurrence (and its height), then compacts. Returns
    /// the number of vertices merged away.
    pub fn merge_shared_vertices(&mut self) -> usize {
        let mut first: HashMap<(u64, u64), usize> = HashMap::new();
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut kept_verts = Vec::new();
        let mut kept_heights = Vec::new();
        for (i, v) in self.vertices.iter().enumerate() {
            let key = (v.x.to_bits(), v.y.to_bits());
            if let Some(&kept) = first.get(&key) {
                remap.push(kept);
            } else {
                let fresh = kept_verts.len();
                first.insert(key, fresh);
                kept_verts.push(*v);
                kept_heights.push(self.heights[i]);
                remap.push(fresh);
            }
        }
        let merged = self.vertices.len() - kept_verts.len();
        if merged > 0 {
            self.vertices = kept_verts;
            self.heights = kept_heights;
            for tri in &mut self.triangles {
                for v in tri.iter_mut() {
                    *v = remap[*v];
                }
            }
            self.invalidate_caches();
            self.compute_extents();
            debug!("merged {merged} shared vertices");
        }
        merged
    }

    /// Flips every triangle whose 2D winding is clockwise, so that all
    /// face normals point up. Returns the number flipped.
    pub fn fix_winding(&mut self) -> usize {
        let mut flipped = 0;
        for i in 0..self.triangles.len() {
            let [v0, v1, v2] = self.triangles[i];
            let p1 = self.vertices[v0];
            let p2 = self.vertices[v1];
            let p3 = self.vertices[v2];
            if (p2 - p1).cross(p3 - p1) < 0.0 {
                self.triangles[i] = [v0, v2, v1];
                flipped += 1;
            }
        }
        if flipped > 0 {
            self.invalidate_caches();
        }
        flipped
    }

    /// Copies all vertices and triangles of another TIN into this one,
    /// rebasing the indices. No vertex sharing is attempted; call
    /// [`merge_shared_vertices`](Self::merge_shared_vertices) for that.
    pub fn append(&mut self, other: &Tin) {
        let base = self.num_verts();
        self.vertices.extend_from_slice(&other.vertices);
        self.heights.extend_from_slice(&other.heights);
        self.triangles.reserve(other.triangles.len());
        for &[a, b, c] in &other.triangles {
            self.triangles.push([base + a, base + b, base + c]);
        }
        self.invalidate_caches();
        self.compute_extents();
    }

    /// Moves every vertex by `offset`.
    pub fn translate(&mut self, offset: Point) {
        for v in &mut self.vertices {
            *v += offset;
        }
        // Edge lengths and the outline are translation invariant, but
        // the bin origin is a snapshot of the old extents.
        self.bins = None;
        self.compute_extents();
    }

    /// Multiplies every height by `factor`.
    pub fn scale_heights(&mut self, factor: f32) {
        for z in &mut self.heights {
            *z *= factor;
        }
        self.compute_extents();
    }

    /// Adds `delta` to every height.
    pub fn offset_heights(&mut self, delta: f32) {
        for z in &mut self.heights {
            *z += delta;
        }
        self.compute_extents();
    }

    /// Recomputes the extents and the height range from the current
    /// vertex set.
    pub fn compute_extents(&mut self) {
        if self.vertices.is_empty() {
            self.extents = None;
            self.min_height = 0.0;
            self.max_height = 0.0;
            return;
        }
        let mut rect = Extents::inside_out();
        let mut min_z = f32::MAX;
        let mut max_z = f32::MIN;
        for (v, &z) in self.vertices.iter().zip(&self.heights) {
            rect.grow_to_contain(*v);
            if z < min_z {
                min_z = z;
            }
            if z > max_z {
                max_z = z;
            }
        }
        self.extents = Some(rect);
        self.min_height = min_z;
        self.max_height = max_z;
    }

    /// Returns the XY extents, or `None` for an empty TIN.
    pub fn extents(&self) -> Option<Extents> {
        self.extents
    }

    /// Returns the minimum and maximum height, or `None` for an empty
    /// TIN.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.extents.map(|_| (self.min_height, self.max_height))
    }

    /// Returns the length of the longest edge of triangle `i`.
    pub fn max_edge_length(&self, i: usize) -> f64 {
        let [v0, v1, v2] = self.triangles[i];
        let a = distance(self.vertices[v0], self.vertices[v1]);
        let b = distance(self.vertices[v1], self.vertices[v2]);
        let c = distance(self.vertices[v2], self.vertices[v0]);
        a.max(b).max(c)
    }

    /// Builds the per-triangle longest-edge cache used by
    /// [`cull_by_edge_length`](Self::cull_by_edge_length).
    pub fn compute_edge_lengths(&mut self) {
        let lengths = (0..self.num_tris()).map(|i| self.max_edge_length(i)).collect();
        self.edge_len = Some(lengths);
    }

    /// Removes every triangle whose longest edge is `threshold` or
    /// more, keeping the rest in order. Returns the number removed.
    ///
    /// Long sliver triangles commonly appear around the hull of
    /// irregularly spaced input. The edge cache is computed on demand
    /// and always dropped afterward, along with the other caches.
    pub fn cull_by_edge_length(&mut self, threshold: f64) -> usize {
        if self.edge_len.is_none() {
            self.compute_edge_lengths();
        }
        let lengths = self.edge_len.take().unwrap_or_default();
        let before = self.triangles.len();
        let mut i = 0;
        self.triangles.retain(|_| {
            let keep = lengths[i] < threshold;
            i += 1;
            keep
        });
        let culled = before - self.triangles.len();
        if culled > 0 {
            info!("culled {culled} triangles with max edge >= {threshold}");
            self.invalidate_caches();
        }
        culled
    }

    /// Returns the set of unique triangle edges, built lazily, each as
    /// a `(low, high)` vertex index pair.
    ///
    /// This is an approximation of the mesh outline: interior edges
    /// appear in two triangles but are still included once, so the set
    /// traces the boundary plus all interior connectivity rather than
    /// the silhouette alone.
    pub fn outline(&mut self) -> &HashSet<(usize, usize)> {
        let triangles = &self.triangles;
        self.outline.get_or_insert_with(|| {
            let mut edges = HashSet::new();
            for &[v0, v1, v2] in triangles {
                for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
                    edges.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
            edges
        })
    }

    /// Returns the upward face normal of triangle `i`, single
    /// precision.
    pub fn triangle_normal(&self, i: usize) -> Point3f {
        let [v0, v1, v2] = self.triangles[i];
        let p1 = self.point3f(v0);
        let p2 = self.point3f(v1);
        let p3 = self.point3f(v2);
        (p2 - p1).cross(p3 - p1).normalized()
    }

    fn point3f(&self, v: usize) -> Point3f {
        let p = self.vertices[v];
        Point3f::new(p.x as f32, p.y as f32, self.heights[v])
    }

    /// Builds `resolution` x `resolution` triangle bins to speed up
    /// repeated height queries. Requires up-to-date extents; a TIN
    /// without extents gets no bins and queries stay linear.
    pub fn setup_triangle_bins(&mut self, resolution: usize) {
        self.bins = TriangleBins::build(resolution, self);
    }

    /// Returns the index of a triangle containing `p`, using the bins
    /// when present.
    pub fn find_triangle(&self, p: Point) -> Option<usize> {
        self.locate(p).map(|(i, _)| i)
    }

    /// Returns the surface height at `p` by barycentric interpolation
    /// over the containing triangle.
    pub fn height_at(&self, p: Point) -> Option<f32> {
        self.locate(p).map(|(_, z)| z)
    }

    fn locate(&self, p: Point) -> Option<(usize, f32)> {
        if let Some(bins) = &self.bins {
            let candidates = bins.candidates(p)?;
            for &i in candidates {
                if let Some(z) = self.test_triangle(i, p) {
                    return Some((i, z));
                }
            }
            return None;
        }
        for i in 0..self.num_tris() {
            if let Some(z) = self.test_triangle(i, p) {
                return Some((i, z));
            }
        }
        None
    }

    fn test_triangle(&self, tri: usize, p: Point) -> Option<f32> {
        let [v0, v1, v2] = self.triangles[tri];
        let p1 = self.vertices[v0];
        let p2 = self.vertices[v1];
        let p3 = self.vertices[v2];
        if !point_in_triangle(p, p1, p2, p3) {
            return None;
        }
        let (b0, b1, b2) = barycentric(p1, p2, p3, p)?;
        let z = b0 * self.heights[v0] as f64
            + b1 * self.heights[v1] as f64
            + b2 * self.heights[v2] as f64;
        Some(z as f32)
    }

    /// Returns the planimetric (2D) area of all triangles.
    pub fn area_2d(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[v0, v1, v2]| {
                triangle_area(self.vertices[v0], self.vertices[v1], self.vertices[v2])
            })
            .sum()
    }

    /// Returns the surface (3D) area of all triangles.
    pub fn area_3d(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[v0, v1, v2]| {
                triangle_area3(self.point3(v0), self.point3(v1), self.point3(v2))
            })
            .sum()
    }

    fn point3(&self, v: usize) -> Point3 {
        let p = self.vertices[v];
        Point3::new(p.x, p.y, self.heights[v] as f64)
    }

    /// Returns the approximate number of bytes used, including any
    /// caches currently built.
    pub fn memory_used(&self) -> usize {
        let mut bytes = size_of::<Self>();
        bytes += self.vertices.len() * size_of::<Point>();
        bytes += self.heights.len() * size_of::<f32>();
        bytes += self.triangles.len() * size_of::<[usize; 3]>();
        if let Some(lengths) = &self.edge_len {
            bytes += lengths.len() * size_of::<f64>();
        }
        if let Some(outline) = &self.outline {
            bytes += outline.len() * size_of::<(usize, usize)>();
        }
        if let Some(bins) = &self.bins {
            bytes += bins.memory_used();
        }
        bytes
    }

    fn invalidate_caches(&mut self) {
        self.edge_len = None;
        self.outline = None;
        self.bins = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::PolygonFeature;
    use crate::geometry::{Polygon, Polyline};
    use crate::grid::ElevationGrid;

    fn flat_grid(cols: usize, rows: usize, z: f32) -> ElevationGrid {
        let mut grid = ElevationGrid::new(Point::new(0.0, 0.0), (1.0, 1.0), cols, rows);
        for c in 0..cols {
            for r in 0..rows {
                grid.set_value(c, r, z);
            }
        }
        grid
    }

    fn cross2d(tin: &Tin, i: usize) -> f64 {
        let [v0, v1, v2] = tin.triangle(i);
        let p1 = tin.vertex(v0);
        let p2 = tin.vertex(v1);
        let p3 = tin.vertex(v2);
        (p2 - p1).cross(p3 - p1)
    }

    #[test]
    fn grid_two_by_two_full() {
        let grid = ElevationGrid::from_heights(
            Point::new(0.0, 0.0),
            (1.0, 1.0),
            2,
            2,
            vec![0.0, 1.0, 2.0, 3.0],
        );
        let tin = Tin::from_grid(&grid);
        assert_eq!(tin.num_verts(), 4);
        assert_eq!(tin.num_tris(), 2);
        let e = tin.extents().unwrap();
        assert_eq!(e.min, Point::new(0.0, 0.0));
        assert_eq!(e.max, Point::new(1.0, 1.0));
        assert_eq!(tin.height_range(), Some((0.0, 3.0)));
        assert!((tin.area_2d() - 1.0).abs() < 1e-12);
        let mut seen = [false; 4];
        for t in tin.triangles() {
            for &v in t {
                seen[v] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn grid_missing_corner_gives_one_triangle() {
        for missing in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let mut grid = flat_grid(2, 2, 2.0);
            grid.set_value(missing.0, missing.1, NO_DATA);
            let tin = Tin::from_grid(&grid);
            assert_eq!(tin.num_tris(), 1);
            // The invalid post is compacted away.
            assert_eq!(tin.num_verts(), 3);
            assert_eq!(tin.height_range(), Some((2.0, 2.0)));
            assert!(cross2d(&tin, 0) > 0.0);
        }
    }

    #[test]
    fn grid_sparse_cell_gives_nothing() {
        let mut grid = flat_grid(2, 2, 2.0);
        grid.set_value(0, 0, NO_DATA);
        grid.set_value(1, 1, NO_DATA);
        let tin = Tin::from_grid(&grid);
        assert_eq!(tin.num_tris(), 0);
        assert_eq!(tin.num_verts(), 0);
        assert!(tin.extents().is_none());
        assert!(tin.height_range().is_none());
    }

    #[test]
    fn grid_winding_is_counter_clockwise() {
        let grid = flat_grid(4, 3, 1.0);
        let tin = Tin::from_grid(&grid);
        assert_eq!(tin.num_tris(), 12);
        for i in 0..tin.num_tris() {
            assert!(cross2d(&tin, i) > 0.0);
        }
        assert!((tin.area_2d() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn point_cloud_square() {
        let pts = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(4.0, 0.0, 2.0),
            Point3::new(4.0, 4.0, 3.0),
            Point3::new(0.0, 4.0, 4.0),
        ];
        let tin = Tin::from_point_cloud(&pts).unwrap();
        assert_eq!(tin.num_verts(), 4);
        assert_eq!(tin.num_tris(), 2);
        assert!((tin.area_2d() - 16.0).abs() < 1e-9);
        for t in tin.triangles() {
            for &v in t {
                assert!(v < tin.num_verts());
            }
        }
    }

    #[test]
    fn point_cloud_failures_are_distinct() {
        let two = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            Tin::from_point_cloud(&two),
            Err(TinError::TooFewPoints(2))
        ));
        let collinear = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(matches!(
            Tin::from_point_cloud(&collinear),
            Err(TinError::NoTriangles)
        ));
    }

    fn donut_feature() -> PolygonFeature {
        PolygonFeature::new(Polygon::new(vec![
            Polyline::new(vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ]),
            Polyline::new(vec![
                Point::new(4.0, 4.0),
                Point::new(4.0, 6.0),
                Point::new(6.0, 6.0),
                Point::new(6.0, 4.0),
            ]),
        ]))
    }

    #[test]
    fn polygon_features_constant_height() {
        let mut set = PolygonSet::new();
        set.push(donut_feature());
        let tin = Tin::from_polygon_features(&set, &HeightSource::Constant(5.0)).unwrap();
        // A ring-with-hole triangulation without extra points always
        // yields verts + 2*holes - 2 triangles.
        assert_eq!(tin.num_tris(), 8);
        assert!((tin.area_2d() - 96.0).abs() < 1e-9);
        for &z in tin.heights() {
            assert_eq!(z, 5.0);
        }
        // No triangle covers the hole.
        assert!(tin.height_at(Point::new(5.0, 5.0)).is_none());
        assert_eq!(tin.height_at(Point::new(1.0, 1.0)), Some(5.0));
    }

    #[test]
    fn polygon_features_field_height() {
        let mut set = PolygonSet::new();
        let mut with_field = donut_feature();
        with_field
            .attributes
            .insert("height".into(), "12.5".into());
        set.push(with_field);
        // This one lacks the attribute and is skipped.
        set.push(donut_feature());
        let tin =
            Tin::from_polygon_features(&set, &HeightSource::Field("height".into())).unwrap();
        assert_eq!(tin.num_tris(), 8);
        for &z in tin.heights() {
            assert_eq!(z, 12.5);
        }
    }

    #[test]
    fn polygon_features_empty_set_is_empty_tin() {
        let set = PolygonSet::new();
        let tin = Tin::from_polygon_features(&set, &HeightSource::Constant(1.0)).unwrap();
        assert!(tin.is_empty());
        assert!(tin.extents().is_none());
    }

    #[test]
    fn manual_build_and_compact() {
        let mut tin = Tin::new();
        tin.add_vertex(Point::new(0.0, 0.0), 1.0);
        tin.add_vertex(Point::new(2.0, 0.0), 1.0);
        tin.add_vertex(Point::new(0.0, 2.0), 1.0);
        let orphan = tin.add_vertex(Point::new(50.0, 50.0), 9.0);
        tin.add_triangle(0, 1, 2);
        assert_eq!(orphan, 3);
        assert_eq!(tin.remove_unused_vertices(), 1);
        assert_eq!(tin.num_verts(), 3);
        assert_eq!(tin.triangle(0), [0, 1, 2]);
        // The orphan no longer contributes to the extents.
        assert_eq!(tin.extents().unwrap().max, Point::new(2.0, 2.0));
        assert_eq!(tin.height_range(), Some((1.0, 1.0)));
    }

    #[test]
    #[should_panic]
    fn add_triangle_out_of_range_panics() {
        let mut tin = Tin::new();
        tin.add_vertex(Point::new(0.0, 0.0), 0.0);
        tin.add_triangle(0, 1, 2);
    }

    #[test]
    fn remove_vertex_drops_referencing_triangles() {
        let grid = flat_grid(2, 2, 1.0);
        let mut tin = Tin::from_grid(&grid);
        assert_eq!(tin.num_tris(), 2);
        // Column-major order: vertex 1 is (0, 1), shared by both
        // triangles of the cell.
        tin.remove_vertex(1);
        assert_eq!(tin.num_verts(), 3);
        assert_eq!(tin.num_tris(), 0);

        let mut tin = Tin::from_grid(&flat_grid(2, 2, 1.0));
        // Vertex 0 is (0, 0), used by the first triangle only.
        tin.remove_vertex(0);
        assert_eq!(tin.num_tris(), 1);
        for &v in &tin.triangle(0) {
            assert!(v < tin.num_verts());
        }
    }

    #[test]
    fn merge_shared_vertices_welds_fan() {
        let mut tin = Tin::new();
        // Two triangles sharing an apex that was added twice.
        tin.add_vertex(Point::new(0.0, 0.0), 3.0);
        tin.add_vertex(Point::new(2.0, 0.0), 1.0);
        tin.add_vertex(Point::new(2.0, 2.0), 1.0);
        tin.add_vertex(Point::new(0.0, 0.0), 7.0);
        tin.add_vertex(Point::new(0.0, 2.0), 1.0);
        tin.add_triangle(0, 1, 2);
        tin.add_triangle(3, 2, 4);
        assert_eq!(tin.merge_shared_vertices(), 1);
        assert_eq!(tin.num_verts(), 4);
        assert_eq!(tin.num_tris(), 2);
        for t in tin.triangles() {
            for &v in t {
                assert!(v < tin.num_verts());
            }
        }
        // First occurrence wins, including its height.
        assert_eq!(tin.height(0), 3.0);
        assert_eq!(tin.merge_shared_vertices(), 0);
    }

    #[test]
    fn fix_winding_flips_clockwise_triangles() {
        let mut tin = Tin::new();
        tin.add_vertex(Point::new(0.0, 0.0), 0.0);
        tin.add_vertex(Point::new(2.0, 0.0), 0.0);
        tin.add_vertex(Point::new(0.0, 2.0), 0.0);
        // Clockwise on purpose.
        tin.add_triangle(0, 2, 1);
        tin.add_triangle(0, 1, 2);
        assert!(cross2d(&tin, 0) < 0.0);
        assert_eq!(tin.fix_winding(), 1);
        assert!(cross2d(&tin, 0) > 0.0);
        assert!(cross2d(&tin, 1) > 0.0);
        assert_eq!(tin.fix_winding(), 0);
    }

    #[test]
    fn culling_removes_long_slivers() {
        let mut tin = Tin::from_grid(&flat_grid(3, 3, 1.0));
        assert_eq!(tin.num_tris(), 8);
        // Stretch a sliver far out of the unit cells.
        let apex = tin.add_vertex(Point::new(100.0, 0.5), 1.0);
        tin.add_triangle(0, 1, apex);
        tin.compute_extents();
        assert_eq!(tin.num_tris(), 9);

        let culled = tin.cull_by_edge_length(5.0);
        assert_eq!(culled, 1);
        assert_eq!(tin.num_tris(), 8);
        for i in 0..tin.num_tris() {
            assert!(tin.max_edge_length(i) < 5.0);
        }
        // Threshold is exclusive: the cell diagonals sit exactly at
        // sqrt(2) and are culled too.
        let culled = tin.cull_by_edge_length(2.0f64.sqrt());
        assert_eq!(culled, 8);
        assert!(tin.is_empty());
    }

    #[test]
    fn culling_keeps_survivors_in_order() {
        let mut tin = Tin::new();
        for (width, z) in [(1.0, 1.0), (5.0, 2.0), (10.0, 3.0)] {
            let a = tin.add_vertex(Point::new(0.0, 0.0), z);
            let b = tin.add_vertex(Point::new(width, 0.0), z);
            let c = tin.add_vertex(Point::new(width / 2.0, 0.5), z);
            tin.add_triangle(a, b, c);
        }
        tin.compute_extents();
        assert_eq!(tin.max_edge_length(0), 1.0);
        assert_eq!(tin.max_edge_length(1), 5.0);
        assert_eq!(tin.max_edge_length(2), 10.0);

        let culled = tin.cull_by_edge_length(6.0);
        assert_eq!(culled, 1);
        assert_eq!(tin.num_tris(), 2);
        assert_eq!(tin.height(tin.triangle(0)[0]), 1.0);
        assert_eq!(tin.height(tin.triangle(1)[0]), 2.0);
    }

    #[test]
    fn outline_contains_unique_edges() {
        let mut tin = Tin::from_grid(&flat_grid(2, 2, 1.0));
        let outline = tin.outline();
        // 4 boundary edges plus the shared diagonal, each once.
        assert_eq!(outline.len(), 5);
        assert!(outline.contains(&(1, 2)));
        for &(a, b) in outline.iter() {
            assert!(a < b);
        }
    }

    #[test]
    fn height_queries_interpolate() {
        let mut grid = flat_grid(2, 2, 0.0);
        grid.set_value(1, 0, 4.0);
        grid.set_value(1, 1, 4.0);
        let tin = Tin::from_grid(&grid);
        // The surface ramps linearly from z=0 at x=0 to z=4 at x=1.
        assert_eq!(tin.height_at(Point::new(0.5, 0.5)), Some(2.0));
        assert_eq!(tin.height_at(Point::new(0.25, 0.5)), Some(1.0));
        assert!(tin.height_at(Point::new(2.0, 0.5)).is_none());
        assert!(tin.find_triangle(Point::new(0.1, 0.5)).is_some());
    }

    #[test]
    fn bins_and_linear_scan_agree() {
        let mut grid = flat_grid(5, 4, 1.0);
        grid.set_value(2, 2, NO_DATA);
        let mut tin = Tin::from_grid(&grid);
        let linear = tin.clone();
        tin.setup_triangle_bins(8);

        let mut y = -0.5;
        while y < 3.5 {
            let mut x = -0.5;
            while x < 4.5 {
                let p = Point::new(x, y);
                assert_eq!(tin.height_at(p), linear.height_at(p));
                x += 0.25;
            }
            y += 0.25;
        }
        // Vertex queries reproduce the vertex heights.
        for i in 0..tin.num_verts() {
            assert_eq!(tin.height_at(tin.vertex(i)), Some(tin.height(i)));
        }
    }

    #[test]
    fn append_rebases_indices() {
        let a = Tin::from_grid(&flat_grid(2, 2, 1.0));
        let mut b = Tin::from_grid(&flat_grid(2, 2, 3.0));
        b.translate(Point::new(10.0, 0.0));
        let mut joined = a.clone();
        joined.append(&b);
        assert_eq!(joined.num_verts(), 8);
        assert_eq!(joined.num_tris(), 4);
        assert_eq!(joined.triangle(2), [
            b.triangle(0)[0] + 4,
            b.triangle(0)[1] + 4,
            b.triangle(0)[2] + 4,
        ]);
        assert_eq!(joined.height_range(), Some((1.0, 3.0)));
        assert_eq!(joined.extents().unwrap().max, Point::new(11.0, 1.0));
    }

    #[test]
    fn transforms_update_extents() {
        let mut tin = Tin::from_grid(&flat_grid(2, 2, 2.0));
        tin.translate(Point::new(5.0, -1.0));
        let e = tin.extents().unwrap();
        assert_eq!(e.min, Point::new(5.0, -1.0));
        assert_eq!(e.max, Point::new(6.0, 0.0));

        tin.scale_heights(3.0);
        assert_eq!(tin.height_range(), Some((6.0, 6.0)));
        tin.offset_heights(-1.0);
        assert_eq!(tin.height_range(), Some((5.0, 5.0)));
    }

    #[test]
    fn triangle_normals_point_up() {
        let tin = Tin::from_grid(&flat_grid(2, 2, 7.0));
        for i in 0..tin.num_tris() {
            let n = tin.triangle_normal(i);
            assert!((n.x).abs() < 1e-6);
            assert!((n.y).abs() < 1e-6);
            assert!((n.z - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn memory_accounting_counts_caches() {
        let mut tin = Tin::from_grid(&flat_grid(4, 4, 1.0));
        let bare = tin.memory_used();
        tin.compute_edge_lengths();
        let with_edges = tin.memory_used();
        assert!(with_edges > bare);
        tin.outline();
        tin.setup_triangle_bins(4);
        assert!(tin.memory_used() > with_edges);
        // Topology changes drop the caches again.
        tin.cull_by_edge_length(0.5);
        assert_eq!(tin.memory_used(), size_of::<Tin>() + 16 * (size_of::<Point>() + size_of::<f32>()));
    }
}
