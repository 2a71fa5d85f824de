//! Polygon feature collections: attributes, the mark-then-compact
//! deletion protocol, geometry fixup and containment scans.

use std::collections::BTreeMap;

use log::info;

use crate::geometry::{Extents, Point, Polygon};

/// A polygon with its attribute record.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PolygonFeature {
    pub polygon: Polygon,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip)]
    to_delete: bool,
}

impl PolygonFeature {
    /// Creates a feature with an empty attribute record.
    pub fn new(polygon: Polygon) -> Self {
        Self {
            polygon,
            attributes: BTreeMap::new(),
            to_delete: false,
        }
    }

    /// Creates a feature with attributes.
    pub fn with_attributes(polygon: Polygon, attributes: BTreeMap<String, String>) -> Self {
        Self {
            polygon,
            attributes,
            to_delete: false,
        }
    }

    /// Returns the named attribute parsed as a number, when present and
    /// parseable.
    pub fn numeric_field(&self, name: &str) -> Option<f64> {
        self.attributes.get(name)?.trim().parse().ok()
    }

    /// True when the feature has been flagged for the next
    /// [`PolygonSet::apply_deletion`] pass.
    pub fn is_marked_for_deletion(&self) -> bool {
        self.to_delete
    }
}

/// Caller-owned single-slot cache for containment scans.
///
/// Sequential queries (scan-line terrain sampling, for example) tend to
/// hit the same polygon repeatedly, so scans check the last hit before
/// searching. One cursor belongs to one logical query stream; it is not
/// meant to be shared across threads. After mutating the queried
/// collection, [`reset`](Self::reset) the cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindCursor {
    pub(crate) last_found: Option<usize>,
}

impl FindCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the cached hit.
    pub fn reset(&mut self) {
        self.last_found = None;
    }
}

/// Counts reported by [`PolygonSet::fix_geometry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Degenerate or colinear points removed across all rings.
    pub points_removed: usize,
    /// Rings reversed to restore the winding convention.
    pub rings_flipped: usize,
    /// Features flagged for deletion because a ring fell below 3 points.
    pub features_flagged: usize,
}

/// An ordered collection of polygon features.
///
/// Feature indices are stable until [`apply_deletion`][Self::apply_deletion]
/// compacts the collection; algorithms that hold indices across
/// mutations rely on this.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PolygonSet {
    features: Vec<PolygonFeature>,
}

impl PolygonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a feature and returns its index.
    pub fn push(&mut self, feature: PolygonFeature) -> usize {
        self.features.push(feature);
        self.features.len() - 1
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&PolygonFeature> {
        self.features.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut PolygonFeature> {
        self.features.get_mut(i)
    }

    /// Returns the polygon of feature `i`. Panics when out of range.
    pub fn polygon(&self, i: usize) -> &Polygon {
        &self.features[i].polygon
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolygonFeature> {
        self.features.iter()
    }

    /// Computes the extents over every feature, or `None` when the
    /// collection holds no geometry.
    pub fn compute_extents(&self) -> Option<Extents> {
        let mut rect = Extents::inside_out();
        for f in &self.features {
            if let Some(e) = f.polygon.compute_extents() {
                rect.grow_to_contain_extents(e);
            }
        }
        rect.is_valid().then_some(rect)
    }

    /// Finds the first feature whose polygon contains `p` by linear
    /// scan, checking the cursor's last hit first.
    pub fn find_polygon(&self, p: Point, cursor: &mut FindCursor) -> Option<usize> {
        if let Some(last) = cursor.last_found {
            if let Some(f) = self.features.get(last) {
                if f.polygon.contains_point(p) {
                    return Some(last);
                }
            }
        }
        for (i, f) in self.features.iter().enumerate() {
            if f.polygon.contains_point(p) {
                cursor.last_found = Some(i);
                return Some(i);
            }
        }
        cursor.last_found = None;
        None
    }

    /// Flags feature `i` for the next
    /// [`apply_deletion`][Self::apply_deletion] pass. Panics when out of
    /// range.
    pub fn mark_for_deletion(&mut self, i: usize) {
        self.features[i].to_delete = true;
    }

    /// Removes every flagged feature in one stable compaction and
    /// returns how many were removed. Indices of surviving features
    /// shift down; cursors and spatial indexes over this collection are
    /// stale afterward.
    pub fn apply_deletion(&mut self) -> usize {
        let before = self.features.len();
        self.features.retain(|f| !f.to_delete);
        let deleted = before - self.features.len();
        if deleted > 0 {
            info!("Deleted {deleted} flagged features");
        }
        deleted
    }

    /// Cleans up every feature's geometry: removes coincident points at
    /// `epsilon` and colinear points at a tenth of it, restores the
    /// winding convention, and flags (without deleting) features left
    /// with a ring below 3 points. The caller decides when to
    /// [`apply_deletion`](Self::apply_deletion).
    pub fn fix_geometry(&mut self, epsilon: f64) -> FixReport {
        let mut report = FixReport::default();
        for i in 0..self.features.len() {
            let poly = &mut self.features[i].polygon;
            report.points_removed += poly.remove_degenerate_points(epsilon);
            // Perpendicular offsets are far more sensitive than
            // point-to-point distances.
            report.points_removed += poly.remove_colinear_points(epsilon / 10.0);

            if poly.is_degenerate() {
                self.features[i].to_delete = true;
                report.features_flagged += 1;
                continue;
            }
            report.rings_flipped += poly.fix_winding();
        }
        info!(
            "Fixed geometry: {} points removed, {} rings flipped, {} features flagged",
            report.points_removed, report.rings_flipped, report.features_flagged
        );
        report
    }
}
