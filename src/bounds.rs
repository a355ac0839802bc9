// Per-item score ceilings for one cluster.
//
// For any user u in the cluster and any item i, the triangle inequality
// around the centroid gives θ_ui ≥ θ_ic − θ_uc ≥ θ_ic − θ_max, so
//
//   u·i = ‖u‖·‖i‖·cos θ_ui ≤ ‖u‖ · ‖i‖·cos(max(0, θ_ic − θ_max))
//
// The per-user factor ‖u‖ is applied later, in the top-K scan.

use crate::linalg;

/// ub[i] = ‖i‖·cos(max(0, θ_ic − θ_max)), plus the descending visit order.
pub struct UpperBounds {
    /// Ceilings in original item order.
    pub values: Vec<f32>,
    /// Item indices sorted by ceiling descending, ties by ascending id.
    pub order: Vec<u32>,
}

pub fn build_upper_bounds(item_norms: &[f32], theta_ics: &[f32], theta_max: f32) -> UpperBounds {
    debug_assert_eq!(item_norms.len(), theta_ics.len());
    let mut values = vec![0.0f32; theta_ics.len()];
    linalg::sub_scalar(theta_ics, theta_max, &mut values);
    linalg::clamp_negative_to_zero(&mut values);
    linalg::cos_in_place(&mut values);
    linalg::mul_in_place(&mut values, item_norms);
    let order = linalg::sort_indices_desc(&values);
    UpperBounds { values, order }
}
