use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Money, Rate};
use crate::EngineResult;

use super::scenario::ScenarioOutcome;

/// Number of leading per-share values echoed back for UI spot-checks.
const SCENARIO_SAMPLE_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Descriptive statistics for one valuation dimension.
///
/// Percentiles use nearest-rank selection on the sorted values, so the
/// ordering p5 <= p10 <= ... <= p95 holds exactly; `median` is the same
/// nearest-rank p50.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStatistics {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// One equal-width histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: u32,
}

/// Aggregated result of a full simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub n_scenarios: u32,
    pub enterprise_value: ValueStatistics,
    pub equity_value: ValueStatistics,
    pub per_share_value: ValueStatistics,
    /// Mean share of enterprise value contributed by the terminal value.
    pub terminal_value_pct: Rate,
    /// Equal-width histogram over per-share values.
    pub histogram: Vec<HistogramBin>,
    /// First 100 per-share values in generation order. For UI spot-checks
    /// only; not a representative sample of the distribution.
    pub scenarios_sample: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Nearest-rank percentile from a **sorted** slice: floor(n * p / 100),
/// no interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let idx = (sorted.len() as f64 * p / 100.0).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Sort values ascending and reduce them to summary statistics.
///
/// Standard deviation is the population form, no Bessel correction.
pub(crate) fn describe(values: &mut [f64]) -> EngineResult<ValueStatistics> {
    if values.is_empty() {
        return Err(EngineError::InsufficientData(
            "No values to aggregate".into(),
        ));
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let p50 = percentile_sorted(values, 50.0);

    Ok(ValueStatistics {
        mean,
        median: p50,
        std: variance.sqrt(),
        p5: percentile_sorted(values, 5.0),
        p10: percentile_sorted(values, 10.0),
        p25: percentile_sorted(values, 25.0),
        p50,
        p75: percentile_sorted(values, 75.0),
        p90: percentile_sorted(values, 90.0),
        p95: percentile_sorted(values, 95.0),
    })
}

/// Build an equal-width histogram over a **sorted** slice.
///
/// The top-edge value lands in the last bin. When every value is identical
/// the histogram collapses to a single bin holding all of them.
pub(crate) fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            bin_start: min_val,
            bin_end: max_val,
            count: sorted.len() as u32,
        }];
    }

    let width = (max_val - min_val) / num_bins as f64;
    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            bin_start: min_val + i as f64 * width,
            bin_end: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * width
            },
            count: 0,
        })
        .collect();

    for &v in sorted {
        let idx = (((v - min_val) / width) as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }

    bins
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reduce scenario outcomes to per-dimension statistics and a per-share
/// histogram.
pub fn aggregate(
    outcomes: &[ScenarioOutcome],
    histogram_bins: usize,
) -> EngineResult<SimulationResult> {
    if outcomes.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one scenario outcome is required".into(),
        ));
    }

    // Taken before sorting: generation order matters here.
    let scenarios_sample: Vec<Money> = outcomes
        .iter()
        .take(SCENARIO_SAMPLE_LEN)
        .map(|o| o.per_share_value)
        .collect();

    let terminal_value_pct = outcomes
        .iter()
        .map(|o| o.terminal_value_share)
        .sum::<f64>()
        / outcomes.len() as f64;

    let mut enterprise: Vec<f64> = outcomes.iter().map(|o| o.enterprise_value).collect();
    let mut equity: Vec<f64> = outcomes.iter().map(|o| o.equity_value).collect();
    let mut per_share: Vec<f64> = outcomes.iter().map(|o| o.per_share_value).collect();

    let enterprise_value = describe(&mut enterprise)?;
    let equity_value = describe(&mut equity)?;
    let per_share_value = describe(&mut per_share)?;
    let histogram = build_histogram(&per_share, histogram_bins);

    Ok(SimulationResult {
        n_scenarios: outcomes.len() as u32,
        enterprise_value,
        equity_value,
        per_share_value,
        terminal_value_pct,
        histogram,
        scenarios_sample,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
