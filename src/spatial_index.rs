//! Uniform-grid spatial index accelerating point-in-polygon lookups
//! over a feature collection.

use log::debug;

use crate::features::{FindCursor, PolygonSet};
use crate::geometry::Point;

/// Outcome of an indexed containment query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexQuery {
    /// The point lies inside the feature at this index.
    Found(usize),
    /// The point lies in the covered area but inside no polygon.
    NotFound,
    /// The point lies outside the area the index covers.
    NoCoverage,
}

/// A square grid of buckets holding feature indices.
///
/// Each feature is registered in every cell its bounding box overlaps,
/// so a bucket holds candidates, not answers; containment still has to
/// be tested per candidate. The index is a snapshot: any mutation of
/// the collection it was built from (deletion compaction in particular)
/// leaves it stale, and it must be rebuilt.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    size: usize,
    base: Point,
    step: Point,
    buckets: Vec<Vec<usize>>,
}

impl SpatialIndex {
    /// Builds a `size` by `size` index over the collection. Returns
    /// `None` when the collection has no geometry to cover.
    pub fn build(size: usize, set: &PolygonSet) -> Option<Self> {
        assert!(size > 0, "index must have at least one cell");
        let mut extent = set.compute_extents()?;
        // Grow slightly to keep features off the outer border.
        extent.grow(0.001, 0.001);

        let base = extent.min;
        let step = Point::new(extent.width() / size as f64, extent.height() / size as f64);
        let mut buckets = vec![Vec::new(); size * size];

        for (e, feature) in set.iter().enumerate() {
            let ext = match feature.polygon.compute_extents() {
                Some(ext) => ext,
                None => continue,
            };
            let x1 = ((ext.min.x - base.x) / step.x) as usize;
            let x2 = (((ext.max.x - base.x) / step.x) as usize).min(size - 1);
            let y1 = ((ext.min.y - base.y) / step.y) as usize;
            let y2 = (((ext.max.y - base.y) / step.y) as usize).min(size - 1);
            for x in x1..=x2 {
                for y in y1..=y2 {
                    buckets[x * size + y].push(e);
                }
            }
        }
        debug!("built {size}x{size} spatial index over {} features", set.len());
        Some(Self {
            size,
            base,
            step,
            buckets,
        })
    }

    /// Returns the number of cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the candidate features for the cell containing `p`, or
    /// `None` when `p` falls outside the covered area.
    pub fn candidates(&self, p: Point) -> Option<&[usize]> {
        let x = ((p.x - self.base.x) / self.step.x).floor();
        let y = ((p.y - self.base.y) / self.step.y).floor();
        if x < 0.0 || x >= self.size as f64 || y < 0.0 || y >= self.size as f64 {
            return None;
        }
        Some(&self.buckets[x as usize * self.size + y as usize])
    }

    /// Finds the first feature whose polygon contains `p`, testing the
    /// cursor's last hit before the candidate bucket.
    ///
    /// Agrees with [`PolygonSet::find_polygon`] on the collection the
    /// index was built over: `Found` matches `Some`, and both
    /// `NotFound` and `NoCoverage` correspond to `None`.
    pub fn find_polygon(&self, set: &PolygonSet, p: Point, cursor: &mut FindCursor) -> IndexQuery {
        if let Some(last) = cursor.last_found {
            if let Some(f) = set.get(last) {
                if f.polygon.contains_point(p) {
                    return IndexQuery::Found(last);
                }
            }
        }
        let candidates = match self.candidates(p) {
            Some(c) => c,
            None => return IndexQuery::NoCoverage,
        };
        for &e in candidates {
            if set.polygon(e).contains_point(p) {
                cursor.last_found = Some(e);
                return IndexQuery::Found(e);
            }
        }
        cursor.last_found = None;
        IndexQuery::NotFound
    }
}
