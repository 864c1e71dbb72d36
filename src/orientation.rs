//! Rotation algebra for the turtle frame.
//!
//! All angles are in degrees. Matrices are written row by row to match the usual
//! textbook layout and stored as `glam::DMat3`. The third column of an orientation
//! is the local forward axis (the heading).
//!
//! Elementary rotations by exact multiples of 90° are built from an integer table
//! instead of `sin`/`cos`, so any chain of right-angle turns stays exactly
//! axis-aligned with entries in `{-1, 0, 1}`.

use glam::{DMat3, DVec3};

/// Canonical right angles used by [`grid_candidates`].
pub const RIGHT_ANGLES: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

const ICOS: [f64; 4] = [1.0, 0.0, -1.0, 0.0];
const ISIN: [f64; 4] = [0.0, 1.0, 0.0, -1.0];

/// Builds a matrix from its rows.
pub fn from_rows(rows: [[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(&rows).transpose()
}

/// Returns `(cos, sin)` of `angle` degrees, exact for multiples of 90°.
pub fn cos_sin(angle: f64) -> (f64, f64) {
    match right_angle_index(angle) {
        Some(idx) => (ICOS[idx], ISIN[idx]),
        None => {
            let theta = angle.to_radians();
            (theta.cos(), theta.sin())
        }
    }
}

/// Index into the exact table when `angle` is an integral multiple of 90°.
fn right_angle_index(angle: f64) -> Option<usize> {
    if !angle.is_finite() || angle.fract() != 0.0 {
        return None;
    }
    let whole = angle as i64;
    if whole % 90 != 0 {
        return None;
    }
    Some((whole.rem_euclid(360) / 90) as usize)
}

/// Rotation about the local vertical axis (compass turn).
pub fn yaw_matrix(angle: f64) -> DMat3 {
    let (c, s) = cos_sin(angle);
    from_rows([[c, 0.0, -s], [0.0, 1.0, 0.0], [s, 0.0, c]])
}

/// Rotation about the local lateral axis (nose up/down).
pub fn pitch_matrix(angle: f64) -> DMat3 {
    let (c, s) = cos_sin(angle);
    from_rows([[1.0, 0.0, 0.0], [0.0, c, s], [0.0, -s, c]])
}

/// Rotation about the heading axis.
pub fn roll_matrix(angle: f64) -> DMat3 {
    let (c, s) = cos_sin(angle);
    from_rows([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
}

/// Builds `yaw(compass) * pitch(vertical) * roll(roll)`.
pub fn make_matrix(compass: f64, vertical: f64, roll: f64) -> DMat3 {
    yaw_matrix(compass) * pitch_matrix(vertical) * roll_matrix(roll)
}

/// Squared Frobenius distance between two matrices.
pub fn distance_squared(a: &DMat3, b: &DMat3) -> f64 {
    (*a - *b).to_cols_array().iter().map(|d| d * d).sum()
}

/// The 64 compass/pitch/roll combinations of right angles, compass outermost.
///
/// Several combinations describe the same physical frame; the iteration order is
/// what makes [`grid_align`] deterministic.
pub fn grid_candidates() -> impl Iterator<Item = DMat3> {
    RIGHT_ANGLES.into_iter().flat_map(|compass| {
        RIGHT_ANGLES.into_iter().flat_map(move |pitch| {
            RIGHT_ANGLES
                .into_iter()
                .map(move |roll| make_matrix(compass, pitch, roll))
        })
    })
}

/// Snaps `m` to the closest axis-aligned frame, keeping the first strictly
/// closer candidate.
pub fn grid_align(m: &DMat3) -> DMat3 {
    let mut best = make_matrix(0.0, 0.0, 0.0);
    let mut best_dist = 2.0 * 9.0;
    for candidate in grid_candidates() {
        let dist = distance_squared(m, &candidate);
        if dist < best_dist {
            best = candidate;
            best_dist = dist;
        }
    }
    best
}

/// The local forward axis of `m`.
pub fn heading(m: &DMat3) -> DVec3 {
    m.z_axis
}

/// Right-angle `atan2` for integral inputs: one of `-90`, `0`, `90` or `180` degrees.
pub fn iatan2(y: i64, x: i64) -> f64 {
    if x == 0 {
        if y > 0 { 90.0 } else { -90.0 }
    } else if x > 0 {
        0.0
    } else {
        180.0
    }
}

/// Compass and vertical angle of the heading of `m`, in degrees.
///
/// Integral headings go through [`iatan2`]; any other heading uses the continuous
/// `atan2` with the horizontal magnitude measured in the same x-z plane, so both
/// branches agree on units and on axes. A vertical heading reports compass `0`.
pub fn heading_angles(m: &DMat3) -> (f64, f64) {
    let h = heading(m);
    let integral = h.x.fract() == 0.0 && h.y.fract() == 0.0 && h.z.fract() == 0.0;
    if integral {
        let horizontal = h.x.abs() + h.z.abs();
        let compass = if horizontal != 0.0 {
            iatan2(-(h.x as i64), h.z as i64)
        } else {
            0.0
        };
        (compass, iatan2(-(h.y as i64), horizontal as i64))
    } else {
        let horizontal = (h.x * h.x + h.z * h.z).sqrt();
        let compass = if horizontal >= 1e-9 {
            (-h.x).atan2(h.z).to_degrees()
        } else {
            0.0
        };
        (compass, (-h.y).atan2(horizontal).to_degrees())
    }
}

/// True when the columns of `m` are unit length and mutually orthogonal.
pub fn is_orthonormal(m: &DMat3, tolerance: f64) -> bool {
    (*m * m.transpose()).abs_diff_eq(DMat3::IDENTITY, tolerance)
}
