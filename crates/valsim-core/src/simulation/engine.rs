use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::EngineResult;

use super::assumptions::{sample, AssumptionSet, DistributionParameter};
use super::scenario::{
    project, run_scenario, ProjectionConstants, ScenarioOutcome, MIN_WACC_TERMINAL_SPREAD,
};
use super::stats::{
    aggregate, build_histogram, describe, HistogramBin, SimulationResult, ValueStatistics,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_forecast_years() -> u32 {
    5
}

fn default_n_scenarios() -> u32 {
    10_000
}

/// A stochastic valuation request. Immutable once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Base (Year 0) revenue. Must be positive.
    pub base_year_revenue: Money,
    /// Base year free cash flow; defaults to 10% of base revenue. Carried
    /// for the reporting layer; the projection rebuilds cash flow from
    /// revenue and margins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_year_fcf: Option<Money>,
    /// Net debt for the equity bridge.
    #[serde(default)]
    pub net_debt: Money,
    /// Diluted shares outstanding. Must be positive.
    pub shares_outstanding: f64,
    /// Number of explicit forecast years.
    #[serde(default = "default_forecast_years")]
    pub forecast_years: u32,
    /// Number of Monte Carlo trials.
    #[serde(default = "default_n_scenarios")]
    pub n_scenarios: u32,
    /// The six uncertain assumptions, in percentage points.
    pub assumptions: AssumptionSet,
    /// Seed for reproducible runs; entropy-seeded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Operating ratios used by the projection recurrence.
    #[serde(default)]
    pub constants: ProjectionConstants,
}

impl SimulationRequest {
    /// Base year free cash flow after applying the default.
    pub fn resolved_base_fcf(&self) -> Money {
        self.base_year_fcf
            .unwrap_or(0.1 * self.base_year_revenue)
    }
}

/// Engine-level limits and knobs, independent of any single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of equal-width histogram bins. Clamped to [30, 50].
    pub histogram_bins: usize,
    /// Hard ceiling on trials per request.
    pub max_scenarios: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            histogram_bins: 40,
            max_scenarios: 200_000,
        }
    }
}

impl EngineConfig {
    fn bins(&self) -> usize {
        self.histogram_bins.clamp(30, 50)
    }
}

/// Summary of drawing one distribution repeatedly, for previewing an
/// assumption before a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub n_samples: u32,
    pub statistics: ValueStatistics,
    pub histogram: Vec<HistogramBin>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_request(request: &SimulationRequest) -> EngineResult<()> {
    if !request.base_year_revenue.is_finite() || request.base_year_revenue <= 0.0 {
        return Err(EngineError::InvalidInput {
            field: "base_year_revenue".into(),
            reason: "Must be a positive number".into(),
        });
    }
    if !request.shares_outstanding.is_finite() || request.shares_outstanding <= 0.0 {
        return Err(EngineError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: "Must be a positive number".into(),
        });
    }
    if request.forecast_years < 1 {
        return Err(EngineError::InvalidInput {
            field: "forecast_years".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if request.n_scenarios < 1 {
        return Err(EngineError::InvalidInput {
            field: "n_scenarios".into(),
            reason: "Must be at least 1".into(),
        });
    }

    // Degeneracy policy: reject up front rather than clamp. Draws are
    // re-checked per trial; see `project`.
    let mean_spread =
        (request.assumptions.wacc.mean - request.assumptions.terminal_growth.mean) / 100.0;
    if mean_spread < MIN_WACC_TERMINAL_SPREAD {
        return Err(EngineError::FinancialImpossibility(format!(
            "Mean WACC ({}%) must exceed mean terminal growth ({}%)",
            request.assumptions.wacc.mean, request.assumptions.terminal_growth.mean
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Trial fan-out
// ---------------------------------------------------------------------------

/// Seed for trial `i`, derived from the master seed. StdRng runs u64 seeds
/// through SplitMix64, so consecutive values yield independent streams.
fn trial_seed(master: u64, index: u32) -> u64 {
    master.wrapping_add(index as u64)
}

#[cfg(feature = "parallel")]
fn collect_outcomes(
    request: &SimulationRequest,
    master_seed: u64,
    cancel: &AtomicBool,
) -> EngineResult<Vec<ScenarioOutcome>> {
    (0..request.n_scenarios)
        .into_par_iter()
        .map(|i| {
            if cancel.load(Ordering::Relaxed) {
                return Err(EngineError::Cancelled);
            }
            let mut rng = StdRng::seed_from_u64(trial_seed(master_seed, i));
            run_scenario(request, &mut rng)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn collect_outcomes(
    request: &SimulationRequest,
    master_seed: u64,
    cancel: &AtomicBool,
) -> EngineResult<Vec<ScenarioOutcome>> {
    let mut outcomes = Vec::with_capacity(request.n_scenarios as usize);
    for i in 0..request.n_scenarios {
        if cancel.load(Ordering::Relaxed) {
            return Err(EngineError::Cancelled);
        }
        let mut rng = StdRng::seed_from_u64(trial_seed(master_seed, i));
        outcomes.push(run_scenario(request, &mut rng)?);
    }
    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full stochastic valuation.
pub fn run_simulation(
    request: &SimulationRequest,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<SimulationResult>> {
    run_simulation_with_cancel(request, config, &AtomicBool::new(false))
}

/// Run the full stochastic valuation, checking `cancel` between trials.
///
/// Cancellation and any per-trial failure abort the whole request; no
/// partial result is ever produced.
pub fn run_simulation_with_cancel(
    request: &SimulationRequest,
    config: &EngineConfig,
    cancel: &AtomicBool,
) -> EngineResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_request(request)?;
    if request.n_scenarios > config.max_scenarios {
        return Err(EngineError::InvalidInput {
            field: "n_scenarios".into(),
            reason: format!("Exceeds the configured ceiling of {}", config.max_scenarios),
        });
    }

    let master_seed = request.seed.unwrap_or_else(rand::random);
    let outcomes = collect_outcomes(request, master_seed, cancel)?;
    let result = aggregate(&outcomes, config.bins())?;

    if result.terminal_value_pct > 0.75 {
        warnings.push(format!(
            "Terminal value contributes {:.1}% of enterprise value on average; consider extending the explicit forecast period",
            result.terminal_value_pct * 100.0
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo DCF valuation",
        &serde_json::json!({
            "n_scenarios": request.n_scenarios,
            "forecast_years": request.forecast_years,
            "base_year_revenue": request.base_year_revenue,
            "base_year_fcf": request.resolved_base_fcf(),
            "net_debt": request.net_debt,
            "shares_outstanding": request.shares_outstanding,
            "seed": master_seed,
            "constants": request.constants,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Evaluate one deterministic scenario with every assumption fixed at its
/// mean. This is the zero-variance anchor the stochastic per-share mean
/// converges to as the number of scenarios grows.
pub fn run_point_valuation(
    request: &SimulationRequest,
) -> EngineResult<ComputationOutput<ScenarioOutcome>> {
    let start = Instant::now();

    validate_request(request)?;
    let outcome = project(request, &request.assumptions.mean_draw())?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic point DCF valuation",
        &serde_json::json!({
            "forecast_years": request.forecast_years,
            "base_year_revenue": request.base_year_revenue,
            "net_debt": request.net_debt,
            "shares_outstanding": request.shares_outstanding,
            "constants": request.constants,
        }),
        Vec::new(),
        elapsed,
        outcome,
    ))
}

/// Draw `n_samples` values from a single distribution parameter and reduce
/// them to statistics and a histogram.
pub fn summarize_distribution(
    param: &DistributionParameter,
    n_samples: u32,
    seed: Option<u64>,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<DistributionSummary>> {
    let start = Instant::now();

    if n_samples < 1 {
        return Err(EngineError::InvalidInput {
            field: "n_samples".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if n_samples > config.max_scenarios {
        return Err(EngineError::InvalidInput {
            field: "n_samples".into(),
            reason: format!("Exceeds the configured ceiling of {}", config.max_scenarios),
        });
    }

    let master_seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(master_seed);
    let mut samples: Vec<f64> = (0..n_samples).map(|_| sample(param, &mut rng)).collect();

    let statistics = describe(&mut samples)?;
    let histogram = build_histogram(&samples, config.bins());
    let summary = DistributionSummary {
        n_samples,
        statistics,
        histogram,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Distribution sampling summary",
        &serde_json::json!({
            "parameter": param,
            "n_samples": n_samples,
            "seed": master_seed,
        }),
        Vec::new(),
        elapsed,
        summary,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
