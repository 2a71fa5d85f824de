use std::collections::BTreeMap;

use terrain_geom::{
    features::{PolygonFeature, PolygonSet},
    geometry::{Point, Polygon, Polyline},
    tin::{HeightSource, Tin},
};

fn pad(vertices: Vec<Point>, height: &str) -> PolygonFeature {
    PolygonFeature::with_attributes(
        Polygon::from_outer(Polyline::new(vertices)),
        BTreeMap::from([("height".to_string(), height.to_string())]),
    )
}

#[test]
fn cleanup_then_mesh_building_pads() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut set = PolygonSet::new();
    // A valid pad carrying a duplicated vertex for cleanup to remove.
    let keeper = set.push(pad(
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ],
        "12.0",
    ));
    // A collapsed sliver left over from digitizing.
    let sliver = set.push(pad(
        vec![Point::new(9.0, 0.0), Point::new(12.0, 0.0)],
        "3.0",
    ));

    let report = set.fix_geometry(0.01);
    assert_eq!(report.points_removed, 1);
    assert_eq!(report.features_flagged, 1);
    assert!(set.get(sliver).unwrap().is_marked_for_deletion());
    assert!(!set.get(keeper).unwrap().is_marked_for_deletion());

    assert_eq!(set.apply_deletion(), 1);
    assert_eq!(set.len(), 1);
    assert_eq!(set.polygon(0).rings[0].len(), 4);

    let tin = Tin::from_polygon_features(&set, &HeightSource::Field("height".into()))
        .unwrap();
    assert_eq!(tin.num_tris(), 2);
    assert!((tin.area_2d() - 16.0).abs() < 1e-9);
    assert_eq!(tin.height_at(Point::new(1.0, 1.0)), Some(12.0));
}

#[test]
fn missing_height_field_skips_feature() {
    let mut set = PolygonSet::new();
    set.push(pad(
        vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ],
        "5.0",
    ));
    set.push(PolygonFeature::new(Polygon::from_outer(Polyline::new(vec![
        Point::new(10.0, 0.0),
        Point::new(12.0, 0.0),
        Point::new(12.0, 2.0),
        Point::new(10.0, 2.0),
    ]))));

    let tin = Tin::from_polygon_features(&set, &HeightSource::Field("height".into()))
        .unwrap();
    // Only the attributed pad is meshed.
    assert_eq!(tin.num_tris(), 2);
    assert!((tin.area_2d() - 4.0).abs() < 1e-9);
    assert!(tin.height_at(Point::new(11.0, 1.0)).is_none());
}
