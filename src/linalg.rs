// Dense kernels shared by the pruned and naive top-K paths.
//
// Matrix products go through faer's matmul. The short per-item vectors that
// hold angles and upper bounds are f32 and use plain loops; the compiler
// auto-vectorizes these at opt-level 3.

use std::cmp::Ordering;

use faer::{linalg::matmul::matmul, Accum, MatMut, MatRef, Par};

#[inline(always)]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// C = A·Bᵀ, row-major: A is m×k, B is n×k, C is m×n.
pub fn gemm_nt(c: &mut [f64], a: &[f64], b: &[f64], m: usize, n: usize, k: usize, par: Par) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), n * k);
    debug_assert_eq!(c.len(), m * n);
    matmul(
        MatMut::from_row_major_slice_mut(c, m, n).as_mut(),
        Accum::Replace,
        MatRef::from_row_major_slice(a, m, k),
        MatRef::from_row_major_slice(b, n, k).transpose(),
        1.0f64,
        par,
    );
}

/// y = A·x, row-major: A is m×k, x is k, y is m.
///
/// Always single-threaded: callers sit inside a per-cluster rayon worker, so
/// the BLAS level must not spawn its own threads on top.
pub fn gemv(y: &mut [f64], a: &[f64], x: &[f64], m: usize, k: usize) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(x.len(), k);
    debug_assert_eq!(y.len(), m);
    matmul(
        MatMut::from_row_major_slice_mut(y, m, 1).as_mut(),
        Accum::Replace,
        MatRef::from_row_major_slice(a, m, k),
        MatRef::from_row_major_slice(x, k, 1),
        1.0f64,
        Par::Seq,
    );
}

/// out[i] = v[i] − scalar.
#[inline]
pub fn sub_scalar(v: &[f32], scalar: f32, out: &mut [f32]) {
    debug_assert_eq!(v.len(), out.len());
    for (o, &x) in out.iter_mut().zip(v) {
        *o = x - scalar;
    }
}

/// Clamp negative entries to zero.
#[inline]
pub fn clamp_negative_to_zero(v: &mut [f32]) {
    for x in v.iter_mut() {
        if *x < 0.0 {
            *x = 0.0;
        }
    }
}

#[inline]
pub fn cos_in_place(v: &mut [f32]) {
    for x in v.iter_mut() {
        *x = x.cos();
    }
}

/// v[i] *= by[i].
#[inline]
pub fn mul_in_place(v: &mut [f32], by: &[f32]) {
    debug_assert_eq!(v.len(), by.len());
    for (x, &b) in v.iter_mut().zip(by) {
        *x *= b;
    }
}

/// Index of the entry with the largest magnitude (first one wins on ties).
pub fn argmax_abs(v: &[f32]) -> usize {
    let mut best = 0;
    let mut best_abs = f32::NEG_INFINITY;
    for (i, &x) in v.iter().enumerate() {
        if x.abs() > best_abs {
            best_abs = x.abs();
            best = i;
        }
    }
    best
}

/// Indices of `v` ordered by value descending, ties by ascending index.
pub fn sort_indices_desc(v: &[f32]) -> Vec<u32> {
    let mut idx: Vec<u32> = (0..v.len() as u32).collect();
    idx.sort_unstable_by(|&a, &b| {
        v[b as usize]
            .partial_cmp(&v[a as usize])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    idx
}
