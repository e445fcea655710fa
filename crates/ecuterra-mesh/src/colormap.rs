//! Height colormap for vertex colors.

/// Color for samples that had no elevation data.
pub const NODATA_COLOR: [f32; 3] = [0.9, 0.9, 0.9];

/// Color for the base sheet and walls of a solid.
pub const BASE_COLOR: [f32; 3] = [0.36, 0.28, 0.18];

/// Terrain ramp: deep blue lowlands through green and tan to white peaks.
const TERRAIN_STOPS: [(f32, [f32; 3]); 6] = [
    (0.00, [0.2, 0.2, 0.6]),
    (0.15, [0.0, 0.6, 1.0]),
    (0.25, [0.0, 0.8, 0.4]),
    (0.50, [1.0, 1.0, 0.6]),
    (0.75, [0.5, 0.36, 0.33]),
    (1.00, [1.0, 1.0, 1.0]),
];

/// Color for a normalized height; values outside 0..1 are clamped.
pub fn terrain_color(t: f32) -> [f32; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for pair in TERRAIN_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t < t1 {
            let f = (t - t0) / (t1 - t0);
            return [
                c0[0] + (c1[0] - c0[0]) * f,
                c0[1] + (c1[1] - c0[1]) * f,
                c0[2] + (c1[2] - c0[2]) * f,
            ];
        }
    }
    TERRAIN_STOPS[TERRAIN_STOPS.len() - 1].1
}

/// Normalize `z` into `lo..hi` and map it through [`terrain_color`].
///
/// A flat range maps everything to the bottom of the ramp.
pub fn height_color(z: f64, lo: f64, hi: f64) -> [f32; 3] {
    let range = hi - lo;
    if range <= 0.0 {
        return terrain_color(0.0);
    }
    terrain_color(((z - lo) / range) as f32)
}
