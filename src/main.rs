use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use mimalloc::MiMalloc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pivotk::cluster::ClusterIndex;
use pivotk::{io, naive, topk};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum Mode {
    /// Centroid-angle pruned search over a cluster index.
    #[default]
    Pruned,
    /// Full gemm + per-row selection, no pruning.
    Naive,
}

/// Exact top-K item recommendation over matrix-factorization weights.
#[derive(Parser, Debug)]
#[command(name = "pivotk")]
#[command(about = "Exact top-K inner-product search with centroid-angle pruning")]
struct Args {
    /// User weights CSV, one row per user with F columns.
    #[arg(short = 'q', long)]
    user_weights: PathBuf,

    /// Item weights CSV, one row per item with F columns.
    #[arg(short = 'p', long)]
    item_weights: PathBuf,

    /// Cluster assignment file, one cluster id per user line. Required in
    /// pruned mode.
    #[arg(short = 'c', long)]
    assignments: Option<PathBuf>,

    /// Top K items to return per user.
    #[arg(short = 'k', long, default_value = "10")]
    top_k: usize,

    /// Number of users.
    #[arg(short = 'm', long)]
    num_users: usize,

    /// Number of items.
    #[arg(short = 'n', long)]
    num_items: usize,

    /// Number of latent factors.
    #[arg(short = 'f', long)]
    num_latent_factors: usize,

    /// Items revealed per batch in sorted ceiling order; a power of two.
    #[arg(short = 'b', long, default_value = "256")]
    batch_size: usize,

    /// Worker threads; 0 uses every core.
    #[arg(short = 't', long, default_value = "0")]
    num_threads: usize,

    #[arg(long, value_enum, default_value = "pruned")]
    mode: Mode,

    /// Where to write the top-K id matrix, one CSV row per user.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Where to write per-user search statistics (CSV).
    #[arg(long)]
    user_stats: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if args.num_users == 0 || args.num_items == 0 || args.num_latent_factors == 0 {
        bail!("user, item, and factor counts must all be >= 1");
    }
    if args.top_k == 0 || args.top_k > args.num_items {
        bail!(
            "top-k of {} is outside 1..={}",
            args.top_k,
            args.num_items
        );
    }
    if !args.batch_size.is_power_of_two() {
        bail!("batch size {} is not a power of two", args.batch_size);
    }
    if args.num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.num_threads)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let load_start = Instant::now();
    let item_weights = io::read_weights_csv(
        &args.item_weights,
        args.num_items,
        args.num_latent_factors,
    )?;
    let user_weights = io::read_weights_csv(
        &args.user_weights,
        args.num_users,
        args.num_latent_factors,
    )?;
    info!(
        elapsed_ms = load_start.elapsed().as_millis() as u64,
        users = args.num_users,
        items = args.num_items,
        factors = args.num_latent_factors,
        "loaded weights"
    );

    let compute_start = Instant::now();
    let top_k_items = match args.mode {
        Mode::Naive => naive::top_k(
            &user_weights,
            &item_weights,
            args.num_users,
            args.num_items,
            args.num_latent_factors,
            args.top_k,
        )?,
        Mode::Pruned => run_pruned(&args, &user_weights, &item_weights)?,
    };
    info!(
        elapsed_ms = compute_start.elapsed().as_millis() as u64,
        mode = ?args.mode,
        k = args.top_k,
        "computed top-k"
    );

    if let Some(path) = &args.output {
        io::write_top_k_csv(path, &top_k_items, args.top_k)?;
        info!(path = %path.display(), "wrote top-k matrix");
    }

    Ok(())
}

fn run_pruned(args: &Args, user_weights: &[f64], item_weights: &[f64]) -> Result<Vec<i32>> {
    let assignments_path = args
        .assignments
        .as_ref()
        .context("--assignments is required in pruned mode")?;
    let assignments = io::read_ids_csv(assignments_path, args.num_users)?;

    let index_start = Instant::now();
    let index = ClusterIndex::build(&assignments, user_weights, args.num_latent_factors)?;
    info!(
        elapsed_ms = index_start.elapsed().as_millis() as u64,
        clusters = index.clusters.len(),
        "built cluster index"
    );

    let mut stats = args.user_stats.is_some().then(Vec::new);
    let top_k_items = topk::compute_top_k_all(
        &index,
        user_weights,
        item_weights,
        args.num_latent_factors,
        args.top_k,
        args.batch_size,
        stats.as_mut(),
    )?;

    if let (Some(path), Some(stats)) = (&args.user_stats, &stats) {
        io::write_user_stats_csv(path, stats)?;
        info!(path = %path.display(), rows = stats.len(), "wrote user statistics");
    }

    Ok(top_k_items)
}
