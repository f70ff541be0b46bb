use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use hll_stream::experiment::{self, ExperimentConfig, SUMMARY_FILE_NAME};
use hll_stream::hash::{DEFAULT_FNV_BASE, DEFAULT_HASH_SEED, DEFAULT_POLY_BASE};
use hll_stream::{AnyEstimator, HasherKind};
use tracing_subscriber::EnvFilter;

/// Measure HyperLogLog accuracy over seeded random string streams for every
/// combination of precision and hash function.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory receiving CSV reports, existing `*.csv` files are removed
    #[arg(short, long, env = "HLL_OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// Number of independent streams per run
    #[arg(long, default_value_t = 5)]
    streams: usize,

    /// Number of values per stream
    #[arg(long, default_value_t = 120_000)]
    stream_size: usize,

    /// Checkpoint distance in percent of the stream
    #[arg(long, default_value_t = 5)]
    step_percent: usize,

    /// Stream `i` is seeded with `seed_base + i + 1`
    #[arg(long, default_value_t = 0xC0_FFEE_1234)]
    seed_base: u64,

    #[arg(long, default_value_t = DEFAULT_HASH_SEED)]
    hash_seed: u32,

    #[arg(long, default_value_t = DEFAULT_POLY_BASE)]
    poly_base: u32,

    #[arg(long, default_value_t = DEFAULT_FNV_BASE)]
    fnv_base: u32,

    /// Register index bits to evaluate
    #[arg(long, value_delimiter = ',', default_values_t = [6u8, 8, 10, 12, 14])]
    precisions: Vec<u8>,

    /// Hash functions to evaluate: PolyHash32, Fnv1a32, WyHash64
    #[arg(long, value_delimiter = ',', default_values_t = [HasherKind::Poly32, HasherKind::Fnv1a32])]
    hashers: Vec<HasherKind>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    tracing::info!(output = %args.output.display(), "running HyperLogLog experiments");

    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    clear_reports(&args.output)?;

    let config = ExperimentConfig {
        stream_count: args.streams,
        stream_size: args.stream_size,
        step_percent: args.step_percent,
        seed_base: args.seed_base,
    };

    let mut summaries = Vec::with_capacity(args.precisions.len() * args.hashers.len());
    for &precision in &args.precisions {
        for &kind in &args.hashers {
            let base = match kind {
                HasherKind::Poly32 => args.poly_base,
                HasherKind::Fnv1a32 => args.fnv_base,
                HasherKind::WyHash64 => 0,
            };
            let mut estimator = AnyEstimator::with_base(kind, precision, base, args.hash_seed)
                .with_context(|| format!("invalid configuration for {kind} with b = {precision}"))?;
            summaries.push(experiment::run_and_write(
                &args.output,
                kind.name(),
                &mut estimator,
                &config,
            )?);
        }
    }

    let summary_path = args.output.join(SUMMARY_FILE_NAME);
    experiment::write_report(&summary_path, |out| {
        experiment::write_summary_csv(out, &summaries)
    })?;

    tracing::info!(runs = summaries.len(), path = %summary_path.display(), "saved reports");
    Ok(())
}

/// Remove reports of previous runs
fn clear_reports(dir: &Path) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
