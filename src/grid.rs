//! Elevation-grid abstraction consumed by the TIN builder.

use crate::geometry::Point;

/// Height value marking a grid sample with no data.
pub const NO_DATA: f32 = -32768.0;

/// A regular grid of height samples ("heixels").
///
/// Implementations expose their dimensions, per-sample height (which may
/// be [`NO_DATA`]) and the mapping from grid to world coordinates.
/// Storage, paging and file formats are the implementor's concern.
pub trait ElevationSource {
    /// Returns the grid dimensions as (columns, rows).
    fn dimensions(&self) -> (usize, usize);

    /// Returns the height sample at a grid coordinate, or [`NO_DATA`]
    /// where no sample exists.
    fn value(&self, col: usize, row: usize) -> f32;

    /// Maps a grid coordinate to its world position.
    fn world_point(&self, col: usize, row: usize) -> Point;
}

/// An in-memory [`ElevationSource`] with uniform spacing and
/// column-major sample storage.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElevationGrid {
    origin: Point,
    spacing: (f64, f64),
    cols: usize,
    rows: usize,
    heights: Vec<f32>,
}

impl ElevationGrid {
    /// Creates a grid with every sample set to [`NO_DATA`].
    pub fn new(origin: Point, spacing: (f64, f64), cols: usize, rows: usize) -> Self {
        Self {
            origin,
            spacing,
            cols,
            rows,
            heights: vec![NO_DATA; cols * rows],
        }
    }

    /// Creates a grid from column-major samples (`col * rows + row`).
    ///
    /// Panics when the sample count does not match the dimensions.
    pub fn from_heights(
        origin: Point,
        spacing: (f64, f64),
        cols: usize,
        rows: usize,
        heights: Vec<f32>,
    ) -> Self {
        assert_eq!(heights.len(), cols * rows, "sample count");
        Self {
            origin,
            spacing,
            cols,
            rows,
            heights,
        }
    }

    /// Sets the sample at a grid coordinate. Panics when out of range.
    pub fn set_value(&mut self, col: usize, row: usize, z: f32) {
        assert!(col < self.cols && row < self.rows, "sample ({col}, {row})");
        self.heights[col * self.rows + row] = z;
    }
}

impl ElevationSource for ElevationGrid {
    fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn value(&self, col: usize, row: usize) -> f32 {
        self.heights[col * self.rows + row]
    }

    fn world_point(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.origin.x + self.spacing.0 * col as f64,
            self.origin.y + self.spacing.1 * row as f64,
        )
    }
}
