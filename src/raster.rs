//! Sampling of straight segments into voxel-spaced points.

use glam::DVec3;

/// Samples the segment from `start` to `end` at roughly one world unit per point.
///
/// The parametric step is `1 / |end - start|` and sampling runs while `t` stays in
/// `[0, 1]`, so the first point is always `start` and the last one lands on or just
/// short of `end`. A zero-length (or non-finite) segment yields `start` alone.
pub fn rasterize(start: DVec3, end: DVec3) -> Vec<DVec3> {
    let delta = end - start;
    let length = delta.length();
    if length == 0.0 || !length.is_finite() {
        return vec![start];
    }

    let step = 1.0 / length;
    let mut points = Vec::with_capacity(length.ceil() as usize + 1);
    let mut i = 0u64;
    loop {
        // Multiply instead of accumulating so long segments don't drift.
        let t = i as f64 * step;
        if !(0.0..=1.0).contains(&t) {
            break;
        }
        points.push(start + delta * t);
        i += 1;
    }
    points
}
