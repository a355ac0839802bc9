// Cluster-contiguous view of the user matrix.
//
// Clustering itself happens upstream; this module consumes a per-user
// cluster assignment and derives everything the pruned search needs: the
// member list per cluster (which doubles as the row permutation), the
// centroid of each cluster's user vectors, and its norm.

use crate::error::{Error, Result};
use crate::linalg;

#[derive(Debug)]
pub struct Cluster {
    /// Original user row indices, in cluster order.
    pub user_ids: Vec<u32>,
    /// Mean of the member user vectors, length F.
    pub centroid: Vec<f64>,
    pub centroid_norm: f32,
}

#[derive(Debug)]
pub struct ClusterIndex {
    pub clusters: Vec<Cluster>,
}

impl ClusterIndex {
    /// Build from per-user assignments. Users keep their relative order
    /// inside each cluster; cluster ids with no members are dropped.
    pub fn build(assignments: &[u32], user_weights: &[f64], num_factors: usize) -> Result<Self> {
        if assignments.is_empty() {
            return Err(Error::Config("no users in assignment file".into()));
        }
        if num_factors == 0 {
            return Err(Error::Config("number of latent factors must be >= 1".into()));
        }
        if user_weights.len() != assignments.len() * num_factors {
            return Err(Error::Config(format!(
                "user weight matrix has {} values, expected {} users x {} factors",
                user_weights.len(),
                assignments.len(),
                num_factors
            )));
        }

        let num_slots = *assignments.iter().max().expect("non-empty") as usize + 1;
        let mut counts = vec![0usize; num_slots];
        for &c in assignments {
            counts[c as usize] += 1;
        }

        let mut clusters: Vec<Cluster> = counts
            .iter()
            .map(|&n| Cluster {
                user_ids: Vec::with_capacity(n),
                centroid: vec![0.0; num_factors],
                centroid_norm: 0.0,
            })
            .collect();

        for (uid, &c) in assignments.iter().enumerate() {
            let cluster = &mut clusters[c as usize];
            cluster.user_ids.push(uid as u32);
            let row = &user_weights[uid * num_factors..(uid + 1) * num_factors];
            for (acc, &w) in cluster.centroid.iter_mut().zip(row) {
                *acc += w;
            }
        }

        clusters.retain(|c| !c.user_ids.is_empty());
        for cluster in &mut clusters {
            let inv = 1.0 / cluster.user_ids.len() as f64;
            for v in &mut cluster.centroid {
                *v *= inv;
            }
            cluster.centroid_norm =
                linalg::dot(&cluster.centroid, &cluster.centroid).sqrt() as f32;
        }

        Ok(ClusterIndex { clusters })
    }

    pub fn num_users(&self) -> usize {
        self.clusters.iter().map(|c| c.user_ids.len()).sum()
    }

    /// Copy user rows into cluster-contiguous order.
    pub fn permute_users(&self, user_weights: &[f64], num_factors: usize) -> Vec<f64> {
        let mut permuted = Vec::with_capacity(user_weights.len());
        for cluster in &self.clusters {
            for &uid in &cluster.user_ids {
                let row = &user_weights[uid as usize * num_factors..][..num_factors];
                permuted.extend_from_slice(row);
            }
        }
        permuted
    }
}
