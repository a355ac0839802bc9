use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pivotk::cluster::ClusterIndex;
use pivotk::{compute_top_k_all, naive};

const NUM_USERS: usize = 256;
const NUM_FACTORS: usize = 32;
const NUM_CLUSTERS: usize = 8;

/// Users scattered tightly around a few random directions, so the pruned
/// path has real cluster structure to exploit.
fn synthetic(num_items: usize, seed: u64) -> (Vec<f64>, Vec<f64>, Vec<u32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<f64> = (0..NUM_CLUSTERS * NUM_FACTORS)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();

    let mut users = vec![0.0f64; NUM_USERS * NUM_FACTORS];
    let mut assignments = vec![0u32; NUM_USERS];
    for u in 0..NUM_USERS {
        let c = rng.gen_range(0..NUM_CLUSTERS);
        assignments[u] = c as u32;
        for f in 0..NUM_FACTORS {
            users[u * NUM_FACTORS + f] =
                centers[c * NUM_FACTORS + f] + rng.gen_range(-0.1..0.1);
        }
    }
    let items: Vec<f64> = (0..num_items * NUM_FACTORS)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    (users, items, assignments)
}

fn bench_top10(c: &mut Criterion) {
    let mut group = c.benchmark_group("top10");
    for &num_items in &[1000usize, 4000] {
        let (users, items, assignments) = synthetic(num_items, 42);
        let index = ClusterIndex::build(&assignments, &users, NUM_FACTORS).unwrap();

        group.bench_with_input(BenchmarkId::new("pruned", num_items), &num_items, |b, _| {
            b.iter(|| {
                compute_top_k_all(&index, &users, &items, NUM_FACTORS, 10, 256, None).unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("naive", num_items), &num_items, |b, _| {
            b.iter(|| {
                naive::top_k(&users, &items, NUM_USERS, num_items, NUM_FACTORS, 10).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_top10);
criterion_main!(benches);
