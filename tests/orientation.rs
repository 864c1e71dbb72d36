// tests/orientation.rs
use glam::DMat3;
use voxel_turtle::orientation::{
    cos_sin, distance_squared, from_rows, grid_align, grid_candidates, heading, heading_angles,
    iatan2, is_orthonormal, make_matrix, pitch_matrix, roll_matrix, yaw_matrix,
};

fn entries_are_unit_integers(m: &DMat3) -> bool {
    m.to_cols_array()
        .iter()
        .all(|&v| v == 0.0 || v == 1.0 || v == -1.0)
}

#[test]
fn test_right_angle_table_is_exact() {
    assert_eq!(cos_sin(0.0), (1.0, 0.0));
    assert_eq!(cos_sin(90.0), (0.0, 1.0));
    assert_eq!(cos_sin(180.0), (-1.0, 0.0));
    assert_eq!(cos_sin(270.0), (0.0, -1.0));
    assert_eq!(cos_sin(450.0), (0.0, 1.0));
    // Negative multiples wrap around instead of indexing out of the table.
    assert_eq!(cos_sin(-90.0), (0.0, -1.0));
    assert_eq!(yaw_matrix(-90.0), yaw_matrix(270.0));
}

#[test]
fn test_matrix_layout() {
    // Rows as written in the textbook form.
    assert_eq!(
        yaw_matrix(90.0),
        from_rows([[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]])
    );
    assert_eq!(
        pitch_matrix(90.0),
        from_rows([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]])
    );
    assert_eq!(
        roll_matrix(90.0),
        from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]])
    );
    assert_eq!(heading(&DMat3::IDENTITY), glam::DVec3::Z);
}

#[test]
fn test_product_is_standard_row_by_column() {
    let a = from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let b = from_rows([[9.0, 8.0, 7.0], [6.0, 5.0, 4.0], [3.0, 2.0, 1.0]]);
    let expected = from_rows([
        [30.0, 24.0, 18.0],
        [84.0, 69.0, 54.0],
        [138.0, 114.0, 90.0],
    ]);
    assert_eq!(a * b, expected);
}

#[test]
fn test_right_angle_chains_stay_axis_aligned() {
    let angles = [90.0, -90.0, 180.0, 270.0, 360.0, -270.0, 0.0];
    let mut m = DMat3::IDENTITY;
    // Small LCG so the sequence is long but reproducible.
    let mut seed: u64 = 0x2545_f491;
    for _ in 0..500 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let angle = angles[(seed >> 33) as usize % angles.len()];
        m = match (seed >> 20) % 3 {
            0 => m * yaw_matrix(angle),
            1 => m * pitch_matrix(angle),
            _ => m * roll_matrix(angle),
        };
        assert!(entries_are_unit_integers(&m), "drifted: {m}");
        assert_eq!(m * m.transpose(), DMat3::IDENTITY);
    }
}

#[test]
fn test_arbitrary_angles_remain_orthonormal() {
    let mut m = DMat3::IDENTITY;
    for i in 0..200 {
        let angle = 37.0 + i as f64 * 1.3;
        m = m * yaw_matrix(angle) * pitch_matrix(angle / 2.0) * roll_matrix(-angle);
    }
    assert!(is_orthonormal(&m, 1e-9));
}

#[test]
fn test_grid_align_keeps_aligned_frames() {
    for m in grid_candidates() {
        assert_eq!(grid_align(&m), m);
    }
    let m = make_matrix(90.0, 180.0, 270.0);
    assert_eq!(distance_squared(&grid_align(&m), &m), 0.0);
}

#[test]
fn test_grid_align_snaps_to_a_candidate() {
    assert_eq!(grid_align(&yaw_matrix(10.0)), DMat3::IDENTITY);
    assert_eq!(grid_align(&yaw_matrix(80.0)), yaw_matrix(90.0));

    let skewed = make_matrix(33.0, 61.0, -140.0);
    let snapped = grid_align(&skewed);
    assert!(grid_candidates().any(|c| c == snapped));
    assert!(entries_are_unit_integers(&snapped));
    assert_eq!(grid_candidates().count(), 64);
}

#[test]
fn test_iatan2_quadrants() {
    assert_eq!(iatan2(1, 0), 90.0);
    assert_eq!(iatan2(-1, 0), -90.0);
    assert_eq!(iatan2(0, 1), 0.0);
    assert_eq!(iatan2(0, -1), 180.0);
}

#[test]
fn test_heading_angles_use_degrees_in_both_branches() {
    // Integral heading goes through the table, 45 degrees through atan2.
    let (compass, vertical) = heading_angles(&yaw_matrix(90.0));
    assert_eq!((compass, vertical), (90.0, 0.0));

    let (compass, vertical) = heading_angles(&yaw_matrix(45.0));
    assert!((compass - 45.0).abs() < 1e-9, "compass = {compass}");
    assert!(vertical.abs() < 1e-9);

    let (_, vertical) = heading_angles(&pitch_matrix(90.0));
    assert_eq!(vertical, -90.0);
    let (_, vertical) = heading_angles(&pitch_matrix(30.0));
    assert!((vertical + 30.0).abs() < 1e-9, "vertical = {vertical}");
}

#[test]
fn test_heading_angles_rebuild_the_heading() {
    for m in [yaw_matrix(45.0), make_matrix(120.0, 20.0, 0.0), yaw_matrix(180.0)] {
        let (compass, vertical) = heading_angles(&m);
        let rebuilt = make_matrix(compass, -vertical, 0.0);
        assert!(
            heading(&rebuilt).abs_diff_eq(heading(&m), 1e-9),
            "{} vs {}",
            heading(&rebuilt),
            heading(&m)
        );
    }
}
