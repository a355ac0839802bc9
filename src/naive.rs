// Dense baseline: score every (user, item) pair with one matmul per block
// of user rows, then select top-K per row in parallel. Blocking keeps the
// score buffer at block_rows × num_items regardless of the user count.

use std::cmp::Ordering;

use faer::Par;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::linalg;

const BLOCK_ROWS: usize = 1024;

fn by_score_desc(a: &(f64, i32), b: &(f64, i32)) -> Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.cmp(&b.1))
}

fn select_row_top_k(out: &mut [i32], scores: &[f64], k: usize) {
    let mut scored: Vec<(f64, i32)> = scores
        .iter()
        .enumerate()
        .map(|(i, &s)| (s, i as i32))
        .collect();
    scored.select_nth_unstable_by(k - 1, by_score_desc);
    scored.truncate(k);
    scored.sort_unstable_by(by_score_desc);
    for (slot, &(_, id)) in out.iter_mut().zip(scored.iter()) {
        *slot = id;
    }
}

/// Exact top-K for every user by full enumeration. Ids per row are in
/// descending score order, ties by ascending id.
pub fn top_k(
    user_weights: &[f64],
    item_weights: &[f64],
    num_users: usize,
    num_items: usize,
    num_factors: usize,
    k: usize,
) -> Result<Vec<i32>> {
    if k == 0 || k > num_items {
        return Err(Error::Config(format!(
            "top-k of {k} is outside 1..={num_items}"
        )));
    }
    if user_weights.len() != num_users * num_factors
        || item_weights.len() != num_items * num_factors
    {
        return Err(Error::Config("inconsistent weight matrix shapes".into()));
    }

    let mut top_k_items = vec![0i32; num_users * k];
    let block = BLOCK_ROWS.min(num_users).max(1);
    let mut scores = vec![0.0f64; block * num_items];

    for (users_chunk, out_chunk) in user_weights
        .chunks(block * num_factors)
        .zip(top_k_items.chunks_mut(block * k))
    {
        let rows = users_chunk.len() / num_factors;
        linalg::gemm_nt(
            &mut scores[..rows * num_items],
            users_chunk,
            item_weights,
            rows,
            num_items,
            num_factors,
            Par::rayon(0),
        );
        out_chunk
            .par_chunks_mut(k)
            .zip(scores[..rows * num_items].par_chunks(num_items))
            .for_each(|(out_row, score_row)| select_row_top_k(out_row, score_row, k));
    }

    Ok(top_k_items)
}
