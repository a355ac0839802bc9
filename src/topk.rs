// Pruned exact top-K search, one cluster at a time.
//
// Items are visited in descending upper-bound order and their exact scores
// are revealed in batches: the first batch with one cluster-wide matmul
// (every user reads it), later batches with a per-user gemv, since early
// exit thins out the users that get that far. A user's scan stops as soon
// as its current K-th best score is at least ‖u‖ times the next ceiling;
// no remaining item can beat the heap from there.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use faer::Par;
use rayon::prelude::*;
use tracing::debug;

use crate::bounds::{self, UpperBounds};
use crate::cluster::ClusterIndex;
use crate::error::{Error, Result};
use crate::geometry;
use crate::linalg;

/// Per-user search counters, filled only when the caller passes a sink.
/// Serialization is the driver's job; the scan itself never does I/O.
pub struct UserStats {
    pub cluster_id: u32,
    pub user_id: u32,
    pub theta_uc: f32,
    pub theta_max: f32,
    pub items_visited: u32,
    pub user_micros: u64,
}

// Heap entry ordered so the BinaryHeap root is the entry a descending
// listing would print last: lowest score first, then highest item id.
// Replacing the root whenever a candidate compares less therefore keeps
// the K best, with equal scores resolved toward smaller ids.
struct Candidate {
    score: f64,
    item: i32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.item == other.item
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.item.cmp(&other.item))
    }
}

/// Copy item rows [start, start+len) of the visit order into the sorted
/// scratch buffers.
fn reveal_batch(
    sorted_item_weights: &mut [f64],
    sorted_upper_bounds: &mut [f32],
    ub: &UpperBounds,
    item_weights: &[f64],
    num_factors: usize,
    start: usize,
    len: usize,
) {
    for j in start..start + len {
        let item = ub.order[j] as usize;
        sorted_upper_bounds[j] = ub.values[item];
        let row = &item_weights[item * num_factors..(item + 1) * num_factors];
        sorted_item_weights[j * num_factors..(j + 1) * num_factors].copy_from_slice(row);
    }
}

/// Exact top-K item ids for every user of one cluster.
///
/// `top_k_items` receives |cluster| rows of K ids in descending score order,
/// ties by ascending id. `user_weights` is the cluster's slice of the
/// permuted user matrix; `theta_ics` holds the item-to-centroid angles for
/// this cluster's centroid.
#[allow(clippy::too_many_arguments)]
pub fn compute_top_k_for_cluster(
    top_k_items: &mut [i32],
    cluster_id: u32,
    centroid: &[f64],
    centroid_norm: f32,
    user_ids_in_cluster: &[u32],
    user_weights: &[f64],
    item_weights: &[f64],
    item_norms: &[f32],
    theta_ics: &[f32],
    k: usize,
    batch_size: usize,
    mut stats: Option<&mut Vec<UserStats>>,
) -> Result<()> {
    let num_factors = centroid.len();
    let num_items = item_norms.len();
    let num_users = user_ids_in_cluster.len();
    if num_users == 0 {
        return Ok(());
    }
    if num_factors == 0 {
        return Err(Error::Config("number of latent factors must be >= 1".into()));
    }
    if k == 0 || k > num_items {
        return Err(Error::Config(format!(
            "top-k of {k} is outside 1..={num_items}"
        )));
    }
    if !batch_size.is_power_of_two() {
        return Err(Error::Config(format!(
            "batch size {batch_size} is not a power of two"
        )));
    }
    if user_weights.len() != num_users * num_factors
        || item_weights.len() != num_items * num_factors
        || theta_ics.len() != num_items
        || top_k_items.len() != num_users * k
    {
        return Err(Error::Config(format!(
            "inconsistent shapes for cluster {cluster_id}"
        )));
    }
    let scores_len = num_users
        .checked_mul(batch_size)
        .ok_or_else(|| {
            Error::Config(format!(
                "{num_users} users x batch size {batch_size} overflows the score buffer"
            ))
        })?;

    let user_norms = geometry::row_norms(user_weights, num_users, num_factors);
    let theta_ucs = geometry::angles_to_centroid(
        user_weights,
        &user_norms,
        centroid,
        centroid_norm,
        num_users,
        num_factors,
    );
    let theta_max = theta_ucs[linalg::argmax_abs(&theta_ucs)];
    let ub = bounds::build_upper_bounds(item_norms, theta_ics, theta_max);
    debug!(cluster_id, num_users, theta_max = f64::from(theta_max), "cluster bound ready");

    // Per-cluster scratch. Sorted buffers are extended monotonically as
    // batches are revealed; batch_counter guards the filled region.
    let mask = batch_size - 1;
    let mut sorted_item_weights = vec![0.0f64; num_items * num_factors];
    let mut sorted_upper_bounds = vec![0.0f32; num_items];
    let mut users_dot_items = vec![0.0f64; scores_len];
    let mut ceilings = vec![0.0f32; batch_size];

    // First batch: amortize one matmul across the whole cluster.
    let first_len = batch_size.min(num_items);
    reveal_batch(
        &mut sorted_item_weights,
        &mut sorted_upper_bounds,
        &ub,
        item_weights,
        num_factors,
        0,
        first_len,
    );
    let mut batch_counter = first_len;
    if first_len == batch_size {
        linalg::gemm_nt(
            &mut users_dot_items,
            user_weights,
            &sorted_item_weights[..batch_size * num_factors],
            num_users,
            batch_size,
            num_factors,
            Par::Seq,
        );
    } else {
        // Catalog smaller than one batch; row stride would not match the
        // score buffer, so fill per user.
        for i in 0..num_users {
            linalg::gemv(
                &mut users_dot_items[i * batch_size..i * batch_size + first_len],
                &sorted_item_weights[..first_len * num_factors],
                &user_weights[i * num_factors..(i + 1) * num_factors],
                first_len,
                num_factors,
            );
        }
    }

    for i in 0..num_users {
        let started = stats.is_some().then(Instant::now);
        let u = &user_weights[i * num_factors..(i + 1) * num_factors];
        let u_norm = user_norms[i];
        let row = i * batch_size;

        for l in 0..first_len {
            ceilings[l] = u_norm * sorted_upper_bounds[l];
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k);
        let mut visited = 0u32;

        for j in 0..num_items {
            let lane = j & mask;
            if lane == 0 && j > 0 {
                if j == batch_counter {
                    // All revealed batches exhausted; the last one may be
                    // short.
                    let len = batch_size.min(num_items - j);
                    reveal_batch(
                        &mut sorted_item_weights,
                        &mut sorted_upper_bounds,
                        &ub,
                        item_weights,
                        num_factors,
                        j,
                        len,
                    );
                    batch_counter += len;
                }
                let len = batch_size.min(num_items - j);
                linalg::gemv(
                    &mut users_dot_items[row..row + len],
                    &sorted_item_weights[j * num_factors..(j + len) * num_factors],
                    u,
                    len,
                    num_factors,
                );
                for l in 0..len {
                    ceilings[l] = u_norm * sorted_upper_bounds[j + l];
                }
            }

            if j < k {
                visited += 1;
                heap.push(Candidate {
                    score: users_dot_items[row + lane],
                    item: ub.order[j] as i32,
                });
                continue;
            }

            // The ceiling bounds every score from here on in visit order.
            let worst = heap.peek().expect("seeded with k entries");
            if worst.score >= f64::from(ceilings[lane]) {
                break;
            }
            visited += 1;
            let candidate = Candidate {
                score: users_dot_items[row + lane],
                item: ub.order[j] as i32,
            };
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }

        // Worst pops first; fill the output row back to front.
        let out = &mut top_k_items[i * k..(i + 1) * k];
        let mut slot = k;
        while let Some(c) = heap.pop() {
            slot -= 1;
            out[slot] = c.item;
        }

        if let Some(sink) = stats.as_mut() {
            sink.push(UserStats {
                cluster_id,
                user_id: user_ids_in_cluster[i],
                theta_uc: theta_ucs[i],
                theta_max,
                items_visited: visited,
                user_micros: started.map(|t| t.elapsed().as_micros() as u64).unwrap_or(0),
            });
        }
    }

    Ok(())
}

/// Pruned search over every cluster, in parallel, returning top-K ids in
/// original user-row order.
///
/// Output rows of different clusters are disjoint slices of one permuted
/// buffer, so workers never share mutable state; the rows are scattered
/// back to the original order at the end.
pub fn compute_top_k_all(
    index: &ClusterIndex,
    user_weights: &[f64],
    item_weights: &[f64],
    num_factors: usize,
    k: usize,
    batch_size: usize,
    stats: Option<&mut Vec<UserStats>>,
) -> Result<Vec<i32>> {
    if num_factors == 0 || item_weights.len() % num_factors != 0 {
        return Err(Error::Config(
            "item weight matrix is not a whole number of rows".into(),
        ));
    }
    let num_users = index.num_users();
    let num_items = item_weights.len() / num_factors;
    let collect_stats = stats.is_some();

    let permuted = index.permute_users(user_weights, num_factors);
    let item_norms = geometry::row_norms(item_weights, num_items, num_factors);
    let mut permuted_out = vec![0i32; num_users * k];

    let mut jobs = Vec::with_capacity(index.clusters.len());
    {
        let mut users_rest: &[f64] = &permuted;
        let mut out_rest: &mut [i32] = &mut permuted_out;
        for (cid, cluster) in index.clusters.iter().enumerate() {
            let m = cluster.user_ids.len();
            let (u, u_tail) = users_rest.split_at(m * num_factors);
            let (o, o_tail) = out_rest.split_at_mut(m * k);
            users_rest = u_tail;
            out_rest = o_tail;
            jobs.push((cid as u32, cluster, u, o));
        }
    }

    let per_cluster: Vec<Vec<UserStats>> = jobs
        .into_par_iter()
        .map(|(cid, cluster, cluster_users, out)| -> Result<Vec<UserStats>> {
            let theta_ics = geometry::angles_to_centroid(
                item_weights,
                &item_norms,
                &cluster.centroid,
                cluster.centroid_norm,
                num_items,
                num_factors,
            );
            let mut local = collect_stats.then(Vec::new);
            compute_top_k_for_cluster(
                out,
                cid,
                &cluster.centroid,
                cluster.centroid_norm,
                &cluster.user_ids,
                cluster_users,
                item_weights,
                &item_norms,
                &theta_ics,
                k,
                batch_size,
                local.as_mut(),
            )?;
            Ok(local.unwrap_or_default())
        })
        .collect::<Result<_>>()?;

    if let Some(sink) = stats {
        for local in per_cluster {
            sink.extend(local);
        }
    }

    let mut out = vec![0i32; num_users * k];
    let mut row = 0;
    for cluster in &index.clusters {
        for &uid in &cluster.user_ids {
            out[uid as usize * k..][..k].copy_from_slice(&permuted_out[row * k..][..k]);
            row += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_ordering_pops_worst_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Candidate { score: 2.0, item: 7 });
        heap.push(Candidate { score: 1.0, item: 3 });
        heap.push(Candidate { score: 2.0, item: 4 });
        assert_eq!(heap.pop().unwrap().item, 3); // lowest score
        assert_eq!(heap.pop().unwrap().item, 7); // tie: higher id is worse
        assert_eq!(heap.pop().unwrap().item, 4);
    }

    #[test]
    fn rejects_non_power_of_two_batches() {
        let mut out = [0i32; 1];
        let err = compute_top_k_for_cluster(
            &mut out,
            0,
            &[1.0],
            1.0,
            &[0],
            &[1.0],
            &[1.0],
            &[1.0],
            &[0.0],
            1,
            3,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_k_larger_than_catalog() {
        let mut out = [0i32; 2];
        let err = compute_top_k_for_cluster(
            &mut out,
            0,
            &[1.0],
            1.0,
            &[0],
            &[1.0],
            &[1.0],
            &[1.0],
            &[0.0],
            2,
            4,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
