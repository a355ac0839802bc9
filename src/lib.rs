//! Exact top-K inner-product recommendation for matrix-factorization models.
//!
//! The score between user u and item i factors as ‖u‖·‖i‖·cos θ_ui. Users
//! are grouped by direction around cluster centroids; the triangle
//! inequality around a centroid turns each item's angle to the centroid
//! into a per-item score ceiling for the whole cluster. Visiting items in
//! descending ceiling order lets each user's scan stop as soon as its
//! current K-th best score clears the next ceiling, with output identical
//! to the full scan.
//!
//! [`compute_top_k_all`] runs the search over a pre-computed
//! [`ClusterIndex`]; [`naive::top_k`] is the dense baseline the pruned
//! path is checked against.

pub mod bounds;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod io;
pub mod linalg;
pub mod naive;
pub mod topk;

pub use cluster::ClusterIndex;
pub use error::{Error, Result};
pub use topk::{compute_top_k_all, compute_top_k_for_cluster, UserStats};
