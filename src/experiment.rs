//! Accuracy experiments: feed random streams into an estimator, compare its
//! estimates against exact distinct counts at regular checkpoints and write
//! CSV reports.
//!
//! For every `(hash function, precision)` pair the harness runs several
//! independent streams through the same estimator (reset between streams) and
//! records:
//! - per checkpoint: exact count of the first stream, mean and sample standard
//!   deviation of estimates across streams (`<hasher>_B<p>.csv`),
//! - per run: error statistics against the theoretical `1.04 / sqrt(M)` and
//!   `1.3 / sqrt(M)` bounds (`b_analysis.csv`).

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[cfg(feature = "with_serde")]
use serde::Serialize;

use crate::error::ExperimentError;
use crate::sketch::CardinalitySketch;
use crate::stream::RandomStream;

/// Header of per-checkpoint series reports
pub const SERIES_HEADER: &str =
    "step_index,prefix_size,ft0_exact,nt_estimate,mean_nt,std_nt,lower_nt,upper_nt";
/// Header of the summary report
pub const SUMMARY_HEADER: &str = "hasher,b,m,theory_104,theory_13,mean_abs_rel_err,max_abs_rel_err,mean_sigma_over_e,max_sigma_over_e,share_sigma_le_104,share_sigma_le_13";
/// File name of the summary report
pub const SUMMARY_FILE_NAME: &str = "b_analysis.csv";

/// Parameters shared by all runs of an experiment
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentConfig {
    /// Number of independent streams per run
    pub stream_count: usize,
    /// Number of values in each stream
    pub stream_size: usize,
    /// Distance between checkpoints in percent of the stream
    pub step_percent: usize,
    /// Stream `i` is seeded with `seed_base + i + 1`
    pub seed_base: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            stream_count: 5,
            stream_size: 120_000,
            step_percent: 5,
            seed_base: 0xC0_FFEE_1234,
        }
    }
}

/// Exact and estimated distinct counts of one stream at every checkpoint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub prefix_sizes: Vec<usize>,
    pub exact: Vec<f64>,
    pub estimates: Vec<f64>,
}

/// Feed `stream` into `estimator`, recording exact and estimated counts at
/// each checkpoint. Checkpoints of size 0 are recorded before any insert.
pub fn collect_series<E: CardinalitySketch + ?Sized>(
    stream: &RandomStream,
    estimator: &mut E,
    step_percent: usize,
) -> Series {
    let prefix_sizes = stream.prefix_sizes_by_step_percent(step_percent);
    let values = stream.prefix(stream.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(values.len());
    let mut exact = Vec::with_capacity(prefix_sizes.len());
    let mut estimates = Vec::with_capacity(prefix_sizes.len());

    let mut checkpoints = prefix_sizes.iter().copied().peekable();
    while checkpoints.next_if_eq(&0).is_some() {
        exact.push(0.0);
        estimates.push(estimator.estimate());
    }

    for (i, value) in values.iter().enumerate() {
        if checkpoints.peek().is_none() {
            break;
        }
        estimator.add(value.as_bytes());
        seen.insert(value.as_str());

        let processed = i + 1;
        while checkpoints.next_if(|&size| processed >= size).is_some() {
            exact.push(seen.len() as f64);
            estimates.push(estimator.estimate());
        }
    }

    for _ in checkpoints {
        exact.push(seen.len() as f64);
        estimates.push(estimator.estimate());
    }

    Series {
        prefix_sizes,
        exact,
        estimates,
    }
}

/// Results of running several streams through one estimator configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub hasher: String,
    pub precision: u8,
    pub register_count: usize,
    /// Checkpoints with exact and estimated counts of the first stream
    pub first: Series,
    /// Estimates of every stream, first stream included
    pub estimates: Vec<Vec<f64>>,
}

/// Run `config.stream_count` streams through `estimator`, resetting it
/// before each stream.
pub fn run_for_precision<E: CardinalitySketch + ?Sized>(
    hasher: &str,
    estimator: &mut E,
    config: &ExperimentConfig,
) -> Run {
    let mut first = Series::default();
    let mut estimates = Vec::with_capacity(config.stream_count);

    for i in 0..config.stream_count {
        let seed = config.seed_base.wrapping_add(i as u64).wrapping_add(1);
        let stream = RandomStream::new(seed, config.stream_size);
        estimator.reset();
        let series = collect_series(&stream, estimator, config.step_percent);
        tracing::debug!(hasher, precision = estimator.precision_bits(), stream = i, seed, "collected series");

        estimates.push(series.estimates.clone());
        if i == 0 {
            first = series;
        }
    }

    Run {
        hasher: hasher.to_string(),
        precision: estimator.precision_bits(),
        register_count: estimator.register_count(),
        first,
        estimates,
    }
}

/// Statistics of all streams at one checkpoint
#[derive(Clone, Debug, PartialEq)]
pub struct StepStats {
    pub step: usize,
    pub prefix_size: usize,
    pub exact: f64,
    pub first_estimate: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Per-checkpoint statistics, truncated to the shortest recorded series
pub fn step_stats(run: &Run) -> Vec<StepStats> {
    let steps = run
        .estimates
        .iter()
        .map(Vec::len)
        .chain([
            run.first.prefix_sizes.len(),
            run.first.exact.len(),
            run.first.estimates.len(),
        ])
        .min()
        .unwrap_or(0);
    if run.estimates.is_empty() {
        return Vec::new();
    }

    (0..steps)
        .map(|step| {
            let values: Vec<f64> = run.estimates.iter().map(|series| series[step]).collect();
            let mean = mean(&values);
            StepStats {
                step,
                prefix_size: run.first.prefix_sizes[step],
                exact: run.first.exact[step],
                first_estimate: run.first.estimates[step],
                mean,
                std_dev: sample_std_dev(&values, mean),
            }
        })
        .collect()
}

/// One row of the summary report
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(Serialize))]
pub struct SummaryRow {
    pub hasher: String,
    pub precision: u8,
    pub register_count: usize,
    pub theory_104: f64,
    pub theory_13: f64,
    pub mean_abs_rel_err: f64,
    pub max_abs_rel_err: f64,
    pub mean_sigma_over_e: f64,
    pub max_sigma_over_e: f64,
    pub share_sigma_le_104: f64,
    pub share_sigma_le_13: f64,
}

/// Summarize error of the mean estimate against exact counts and spread of
/// estimates against theoretical bounds.
pub fn summarize(run: &Run, stats: &[StepStats]) -> SummaryRow {
    let m = run.register_count as f64;
    let mut row = SummaryRow {
        hasher: run.hasher.clone(),
        precision: run.precision,
        register_count: run.register_count,
        theory_104: 1.04 / m.sqrt(),
        theory_13: 1.3 / m.sqrt(),
        ..SummaryRow::default()
    };

    let mut err_sum = 0.0;
    let mut err_count = 0usize;
    let mut sigma_sum = 0.0;
    let mut sigma_count = 0usize;
    let mut le_104 = 0usize;
    let mut le_13 = 0usize;

    for s in stats {
        if s.exact > 0.0 {
            let err = (s.mean - s.exact).abs() / s.exact;
            err_sum += err;
            row.max_abs_rel_err = row.max_abs_rel_err.max(err);
            err_count += 1;
        }
        if s.mean > 0.0 {
            let sigma_over_e = s.std_dev / s.mean;
            sigma_sum += sigma_over_e;
            row.max_sigma_over_e = row.max_sigma_over_e.max(sigma_over_e);
            le_104 += usize::from(sigma_over_e <= row.theory_104);
            le_13 += usize::from(sigma_over_e <= row.theory_13);
            sigma_count += 1;
        }
    }

    if err_count > 0 {
        row.mean_abs_rel_err = err_sum / err_count as f64;
    }
    if sigma_count > 0 {
        row.mean_sigma_over_e = sigma_sum / sigma_count as f64;
        row.share_sigma_le_104 = le_104 as f64 / sigma_count as f64;
        row.share_sigma_le_13 = le_13 as f64 / sigma_count as f64;
    }
    row
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation, 0 for fewer than two values
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sq_diff_sum: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sq_diff_sum / (values.len() - 1) as f64).sqrt()
}

pub fn series_file_name(hasher: &str, precision: u8) -> String {
    format!("{hasher}_B{precision}.csv")
}

pub fn write_series_csv<W: Write>(mut out: W, stats: &[StepStats]) -> std::io::Result<()> {
    writeln!(out, "{SERIES_HEADER}")?;
    for s in stats {
        writeln!(
            out,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            s.step,
            s.prefix_size,
            s.exact,
            s.first_estimate,
            s.mean,
            s.std_dev,
            s.mean - s.std_dev,
            s.mean + s.std_dev
        )?;
    }
    out.flush()
}

pub fn write_summary_csv<W: Write>(mut out: W, rows: &[SummaryRow]) -> std::io::Result<()> {
    writeln!(out, "{SUMMARY_HEADER}")?;
    for r in rows {
        writeln!(
            out,
            "{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            r.hasher,
            r.precision,
            r.register_count,
            r.theory_104,
            r.theory_13,
            r.mean_abs_rel_err,
            r.max_abs_rel_err,
            r.mean_sigma_over_e,
            r.max_sigma_over_e,
            r.share_sigma_le_104,
            r.share_sigma_le_13
        )?;
    }
    out.flush()
}

/// Create `path` and write report into it with `write`
pub fn write_report<F>(path: &Path, write: F) -> Result<(), ExperimentError>
where
    F: FnOnce(BufWriter<File>) -> std::io::Result<()>,
{
    let to_error = |source| ExperimentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_error)?;
    write(BufWriter::new(file)).map_err(to_error)
}

/// Run one experiment, write its series report into `dir` and return its summary.
///
/// No series report is written when `config.stream_count` is zero.
pub fn run_and_write<E: CardinalitySketch + ?Sized>(
    dir: &Path,
    hasher: &str,
    estimator: &mut E,
    config: &ExperimentConfig,
) -> Result<SummaryRow, ExperimentError> {
    let run = run_for_precision(hasher, estimator, config);
    let stats = step_stats(&run);
    if run.estimates.is_empty() {
        tracing::warn!(hasher, precision = run.precision, "no streams, skipping series report");
        return Ok(summarize(&run, &stats));
    }

    let path = dir.join(series_file_name(hasher, run.precision));
    write_report(&path, |out| write_series_csv(out, &stats))?;

    let summary = summarize(&run, &stats);
    tracing::info!(
        hasher,
        precision = run.precision,
        mean_abs_rel_err = summary.mean_abs_rel_err,
        path = %path.display(),
        "finished run"
    );
    Ok(summary)
}
