use terrain_geom::{
    geometry::{Point, Point3},
    grid::{ElevationGrid, NO_DATA},
    tin::Tin,
};

fn logged() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn grid_with_void_to_queryable_surface() {
    logged();

    // A 5x5 ramp (z equals the column index) with one missing post in
    // the middle.
    let mut grid = ElevationGrid::new(Point::new(100.0, 200.0), (2.0, 2.0), 5, 5);
    for col in 0..5 {
        for row in 0..5 {
            grid.set_value(col, row, col as f32);
        }
    }
    grid.set_value(2, 2, NO_DATA);

    let mut tin = Tin::from_grid(&grid);
    // 16 cells at two triangles each, except the four cells around the
    // missing post which contribute one.
    assert_eq!(tin.num_tris(), 28);
    assert_eq!(tin.num_verts(), 24);
    let extents = tin.extents().unwrap();
    assert_eq!(extents.min, Point::new(100.0, 200.0));
    assert_eq!(extents.max, Point::new(108.0, 208.0));
    assert_eq!(tin.height_range(), Some((0.0, 4.0)));

    // Each cell is 2x2; the void swallows four half cells.
    assert!((tin.area_2d() - 56.0).abs() < 1e-9);
    assert!(tin.area_3d() > tin.area_2d());

    // The ramp interpolates linearly in x.
    assert_eq!(tin.height_at(Point::new(101.0, 201.0)), Some(0.5));
    assert_eq!(tin.height_at(Point::new(107.0, 207.0)), Some(3.5));
    // Directly over the missing post there is no surface.
    assert_eq!(tin.height_at(Point::new(104.0, 204.0)), None);
    assert_eq!(tin.height_at(Point::new(120.0, 204.0)), None);

    // Bins change the lookup path, not the answers.
    tin.setup_triangle_bins(10);
    assert_eq!(tin.height_at(Point::new(101.0, 201.0)), Some(0.5));
    assert_eq!(tin.height_at(Point::new(104.0, 204.0)), None);
    assert_eq!(tin.height_at(Point::new(120.0, 204.0)), None);
}

#[test]
fn point_cloud_bridge_slivers_culled() {
    logged();

    // Two tight clusters far apart; Delaunay necessarily bridges the
    // gap with long thin triangles.
    let mut pts = Vec::new();
    for i in 0..4 {
        for j in 0..4 {
            pts.push(Point3::new(i as f64, j as f64, 1.0));
            pts.push(Point3::new(i as f64 + 100.0, j as f64, 2.0));
        }
    }
    let mut tin = Tin::from_point_cloud(&pts).unwrap();
    let total = tin.num_tris();

    let culled = tin.cull_by_edge_length(10.0);
    assert!(culled > 0);
    assert_eq!(tin.num_tris() + culled, total);
    for i in 0..tin.num_tris() {
        assert!(tin.max_edge_length(i) < 10.0);
    }

    // Culling leaves vertices alone; every cluster point still carries
    // local triangles, so compaction finds nothing to drop.
    assert_eq!(tin.remove_unused_vertices(), 0);
    assert_eq!(tin.num_verts(), 32);

    // What remains is the two local surfaces.
    assert_eq!(tin.height_at(Point::new(1.5, 1.5)), Some(1.0));
    assert_eq!(tin.height_at(Point::new(101.5, 1.5)), Some(2.0));
    assert_eq!(tin.height_at(Point::new(50.0, 1.5)), None);
}
