//! Core geometry library for terrain-data processing.
//!
//! Covers 2D/3D primitives with degeneracy cleanup and proximity
//! queries, polygon feature collections with a uniform-grid spatial
//! index, and triangulated irregular networks built from elevation
//! grids, point clouds or polygon features.

pub mod features;
pub mod geometry;
pub mod gis;
pub mod grid;
pub mod spatial_index;
pub mod tin;
