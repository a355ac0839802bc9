// Norms and angles between weight rows and a cluster centroid.
//
// Weights and dot products stay in f64; norms and angles are f32, which is
// all the pruning bound needs.

use crate::linalg;

/// Single-precision L2 norms of the rows of a row-major f64 matrix.
pub fn row_norms(rows: &[f64], num_rows: usize, num_factors: usize) -> Vec<f32> {
    debug_assert_eq!(rows.len(), num_rows * num_factors);
    (0..num_rows)
        .map(|i| {
            let r = &rows[i * num_factors..(i + 1) * num_factors];
            linalg::dot(r, r).sqrt() as f32
        })
        .collect()
}

/// θ between every row and a centroid, in [0, π].
///
/// The cosine is clipped to [−1, 1] before acos so cancellation near parallel
/// or antiparallel vectors cannot produce NaN. A zero-norm row or centroid
/// degrades to θ = 0, which keeps the downstream upper bound valid.
pub fn angles_to_centroid(
    rows: &[f64],
    row_norms: &[f32],
    centroid: &[f64],
    centroid_norm: f32,
    num_rows: usize,
    num_factors: usize,
) -> Vec<f32> {
    debug_assert_eq!(rows.len(), num_rows * num_factors);
    debug_assert_eq!(row_norms.len(), num_rows);
    debug_assert_eq!(centroid.len(), num_factors);
    (0..num_rows)
        .map(|i| {
            let denom = row_norms[i] * centroid_norm;
            if denom == 0.0 {
                return 0.0;
            }
            let r = &rows[i * num_factors..(i + 1) * num_factors];
            let cos = (linalg::dot(r, centroid) as f32 / denom).clamp(-1.0, 1.0);
            cos.acos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn norms_of_axis_rows() {
        let rows = [3.0, 4.0, 0.0, 1.0]; // 2×2
        let norms = row_norms(&rows, 2, 2);
        assert!((norms[0] - 5.0).abs() < 1e-6);
        assert!((norms[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn angles_cover_parallel_orthogonal_antiparallel() {
        let rows = [1.0, 0.0, 0.0, 1.0, -2.0, 0.0]; // 3×2
        let norms = row_norms(&rows, 3, 2);
        let centroid = [1.0, 0.0];
        let thetas = angles_to_centroid(&rows, &norms, &centroid, 1.0, 3, 2);
        assert!(thetas[0].abs() < 1e-6);
        assert!((thetas[1] - PI / 2.0).abs() < 1e-6);
        assert!((thetas[2] - PI).abs() < 1e-6);
    }

    #[test]
    fn parallel_rows_never_go_nan() {
        // A row equal to a scaled centroid can push the cosine past 1.0 in
        // f32; the clip must hold it at θ = 0.
        let rows = [0.1, 0.2, 0.3];
        let norms = row_norms(&rows, 1, 3);
        let centroid = [0.2, 0.4, 0.6];
        let cnorm = (0.2f64 * 0.2 + 0.4 * 0.4 + 0.6 * 0.6).sqrt() as f32;
        let thetas = angles_to_centroid(&rows, &norms, &centroid, cnorm, 1, 3);
        assert!(thetas[0].is_finite());
        assert!(thetas[0].abs() < 1e-3);
    }

    #[test]
    fn zero_norm_rows_fall_back_to_zero_angle() {
        let rows = [0.0, 0.0];
        let norms = row_norms(&rows, 1, 2);
        let thetas = angles_to_centroid(&rows, &norms, &[1.0, 0.0], 1.0, 1, 2);
        assert_eq!(thetas[0], 0.0);
    }
}
