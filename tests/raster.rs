// tests/raster.rs
use glam::DVec3;
use voxel_turtle::rasterize;

#[test]
fn test_axis_segment_is_sampled_per_unit() {
    let points = rasterize(DVec3::ZERO, DVec3::new(0.0, 0.0, 5.0));

    assert_eq!(points[0], DVec3::ZERO);
    assert!(points.windows(2).all(|w| w[1].z >= w[0].z));
    let last = points.last().unwrap().z;
    assert!((5.0 - 1e-9..=6.0).contains(&last), "last z = {last}");
    // ceil(5 / 0.2) + 1
    assert!(points.len() <= 26);
    assert_eq!(points.len(), 6);
}

#[test]
fn test_zero_length_yields_start_only() {
    let p = DVec3::new(3.0, -2.0, 7.5);
    assert_eq!(rasterize(p, p), vec![p]);
}

#[test]
fn test_diagonal_spacing_is_one_unit() {
    let points = rasterize(DVec3::ZERO, DVec3::new(3.0, 4.0, 0.0));
    assert_eq!(points.len(), 6);
    for w in points.windows(2) {
        assert!((w[1].distance(w[0]) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_fractional_length_stops_inside_segment() {
    let points = rasterize(DVec3::ZERO, DVec3::new(2.5, 0.0, 0.0));
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|p| p.x <= 2.5));
}

#[test]
fn test_reverse_direction() {
    let points = rasterize(DVec3::new(0.0, 10.0, 0.0), DVec3::new(0.0, 7.0, 0.0));
    assert_eq!(points.first(), Some(&DVec3::new(0.0, 10.0, 0.0)));
    assert!(points.windows(2).all(|w| w[1].y < w[0].y));
    assert_eq!(points.len(), 4);
}
