use pretty_assertions::assert_eq;
use std::sync::atomic::AtomicBool;

use valsim_core::simulation::{
    run_point_valuation, run_simulation, run_simulation_with_cancel, AssumptionSet,
    DistributionFamily, DistributionParameter, EngineConfig, ProjectionConstants,
    SimulationRequest,
};
use valsim_core::EngineError;

const SEED: u64 = 42;

// ===========================================================================
// Request builders
// ===========================================================================

fn point_param(mean: f64) -> DistributionParameter {
    DistributionParameter::point(mean)
}

/// The hand-computed reference case: two forecast years, every assumption a
/// zero-variance point value.
fn degenerate_request() -> SimulationRequest {
    SimulationRequest {
        base_year_revenue: 1000.0,
        base_year_fcf: Some(100.0),
        net_debt: 200.0,
        shares_outstanding: 100.0,
        forecast_years: 2,
        n_scenarios: 1_000,
        assumptions: AssumptionSet {
            revenue_growth: point_param(10.0),
            ebitda_margin: point_param(20.0),
            capex_to_revenue: point_param(5.0),
            nwc_to_revenue_delta: point_param(0.0),
            wacc: point_param(10.0),
            terminal_growth: point_param(2.0),
        },
        seed: Some(SEED),
        constants: ProjectionConstants::default(),
    }
}

fn stochastic_request() -> SimulationRequest {
    SimulationRequest {
        base_year_revenue: 1000.0,
        base_year_fcf: None,
        net_debt: 200.0,
        shares_outstanding: 100.0,
        forecast_years: 5,
        n_scenarios: 20_000,
        assumptions: AssumptionSet {
            revenue_growth: DistributionParameter::normal(5.0, 1.0),
            ebitda_margin: DistributionParameter::normal(20.0, 1.5),
            capex_to_revenue: DistributionParameter {
                family: DistributionFamily::Triangular,
                mean: 5.0,
                std: None,
                min: Some(4.0),
                max: Some(6.5),
            },
            nwc_to_revenue_delta: DistributionParameter {
                family: DistributionFamily::Uniform,
                mean: 2.0,
                std: None,
                min: None,
                max: None,
            },
            wacc: DistributionParameter::normal(10.0, 0.3),
            terminal_growth: DistributionParameter::normal(2.5, 0.1),
        },
        seed: Some(SEED),
        constants: ProjectionConstants::default(),
    }
}

// ===========================================================================
// Degenerate determinism — known-answer test
// ===========================================================================

#[test]
fn test_degenerate_request_reproduces_hand_computed_valuation() {
    let result = run_simulation(&degenerate_request(), &EngineConfig::default()).unwrap();
    let out = &result.result;

    // Year 1 FCF 125.73 and Year 2 FCF 138.30 both discount to 114.30;
    // terminal value 2071.91 discounts to 1712.33.
    assert!((out.enterprise_value.mean - 1940.925).abs() < 1e-6);
    assert!((out.equity_value.mean - 1740.925).abs() < 1e-6);
    assert!((out.per_share_value.mean - 17.40925).abs() < 1e-6);
    assert!((out.terminal_value_pct - 0.88222).abs() < 1e-5);

    // Every scenario is identical, so spread vanishes everywhere.
    assert!(out.enterprise_value.std.abs() < 1e-9);
    assert!(out.per_share_value.std.abs() < 1e-9);
    assert_eq!(out.per_share_value.p5, out.per_share_value.p95);
    assert!((out.per_share_value.median - out.per_share_value.mean).abs() < 1e-9);
}

#[test]
fn test_degenerate_request_collapses_histogram_to_single_bin() {
    let result = run_simulation(&degenerate_request(), &EngineConfig::default()).unwrap();
    let histogram = &result.result.histogram;
    assert_eq!(histogram.len(), 1);
    assert_eq!(histogram[0].count, 1_000);
}

// ===========================================================================
// Statistical properties of a stochastic run
// ===========================================================================

#[test]
fn test_stochastic_mean_converges_to_point_valuation() {
    let request = stochastic_request();
    let simulated = run_simulation(&request, &EngineConfig::default()).unwrap();
    let point = run_point_valuation(&request).unwrap();

    let simulated_mean = simulated.result.per_share_value.mean;
    let anchor = point.result.per_share_value;
    let relative_gap = (simulated_mean - anchor).abs() / anchor;
    assert!(
        relative_gap < 0.02,
        "simulated mean {simulated_mean} should be within 2% of the point valuation {anchor}"
    );
}

#[test]
fn test_percentile_ordering_holds() {
    let result = run_simulation(&stochastic_request(), &EngineConfig::default()).unwrap();
    for stats in [
        &result.result.enterprise_value,
        &result.result.equity_value,
        &result.result.per_share_value,
    ] {
        assert!(stats.p5 <= stats.p10);
        assert!(stats.p10 <= stats.p25);
        assert!(stats.p25 <= stats.p50);
        assert!(stats.p50 <= stats.p75);
        assert!(stats.p75 <= stats.p90);
        assert!(stats.p90 <= stats.p95);
        assert_eq!(stats.median, stats.p50);
    }
}

#[test]
fn test_histogram_mass_equals_scenario_count() {
    let result = run_simulation(&stochastic_request(), &EngineConfig::default()).unwrap();
    let total: u32 = result.result.histogram.iter().map(|b| b.count).sum();
    assert_eq!(total, 20_000);
}

#[test]
fn test_equity_never_negative_under_crushing_debt() {
    let mut request = stochastic_request();
    request.net_debt = 1e9;
    let result = run_simulation(&request, &EngineConfig::default()).unwrap();
    let out = &result.result;
    assert_eq!(out.equity_value.p5, 0.0);
    assert_eq!(out.equity_value.mean, 0.0);
    assert_eq!(out.per_share_value.mean, 0.0);
    // Enterprise value itself is unaffected by the bridge.
    assert!(out.enterprise_value.mean > 0.0);
}

#[test]
fn test_scenarios_sample_capped_at_hundred() {
    let result = run_simulation(&stochastic_request(), &EngineConfig::default()).unwrap();
    assert_eq!(result.result.scenarios_sample.len(), 100);
}

#[test]
fn test_terminal_value_pct_within_unit_interval() {
    let result = run_simulation(&stochastic_request(), &EngineConfig::default()).unwrap();
    let pct = result.result.terminal_value_pct;
    assert!(pct > 0.0 && pct < 1.0, "terminal_value_pct={pct}");
}

#[test]
fn test_seeded_runs_are_identical() {
    let request = stochastic_request();
    let config = EngineConfig::default();
    let a = run_simulation(&request, &config).unwrap();
    let b = run_simulation(&request, &config).unwrap();
    assert_eq!(a.result.per_share_value, b.result.per_share_value);
    assert_eq!(a.result.histogram, b.result.histogram);
    assert_eq!(a.result.scenarios_sample, b.result.scenarios_sample);
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn test_zero_revenue_is_validation_error() {
    let mut request = degenerate_request();
    request.base_year_revenue = 0.0;
    let err = run_simulation(&request, &EngineConfig::default()).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn test_wacc_equal_terminal_growth_rejected_before_any_trial() {
    let mut request = degenerate_request();
    request.assumptions.wacc = point_param(2.0);
    request.assumptions.terminal_growth = point_param(2.0);
    let err = run_simulation(&request, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::FinancialImpossibility(_)));
    assert!(err.is_validation_error());
}

#[test]
fn test_wide_spread_draw_crossing_wacc_fails_whole_request() {
    // Means pass the upfront check, but draws frequently cross.
    let mut request = stochastic_request();
    request.assumptions.wacc = DistributionParameter::normal(6.0, 2.0);
    request.assumptions.terminal_growth = DistributionParameter::normal(5.0, 2.0);
    let err = run_simulation(&request, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::FinancialImpossibility(_)));
}

#[test]
fn test_cancellation_returns_no_partial_result() {
    let cancelled = AtomicBool::new(true);
    let err = run_simulation_with_cancel(
        &stochastic_request(),
        &EngineConfig::default(),
        &cancelled,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

// ===========================================================================
// Wire format
// ===========================================================================

#[test]
fn test_minimal_wire_request_round_trips_with_defaults() {
    let payload = r#"{
        "base_year_revenue": 500.0,
        "shares_outstanding": 50.0,
        "assumptions": {
            "revenue_growth": {"family": "normal", "mean": 6.0, "std": 1.0},
            "ebitda_margin": {"family": "triangular", "mean": 18.0},
            "capex_to_revenue": {"family": "uniform", "mean": 4.0},
            "nwc_to_revenue_delta": {"mean": 1.0},
            "wacc": {"family": "normal", "mean": 9.0, "std": 0.2},
            "terminal_growth": {"family": "normal", "mean": 2.0, "std": 0.1}
        },
        "seed": 7
    }"#;
    let request: SimulationRequest = serde_json::from_str(payload).unwrap();
    assert_eq!(request.forecast_years, 5);
    assert_eq!(request.n_scenarios, 10_000);
    assert_eq!(request.net_debt, 0.0);
    assert_eq!(request.resolved_base_fcf(), 50.0);

    let result = run_simulation(&request, &EngineConfig::default()).unwrap();
    assert_eq!(result.result.n_scenarios, 10_000);
    assert!(result.result.per_share_value.mean > 0.0);
}

#[test]
fn test_unknown_family_on_wire_behaves_as_point_mass() {
    let mut request = degenerate_request();
    request.assumptions.ebitda_margin =
        serde_json::from_str(r#"{"family": "beta", "mean": 20.0}"#).unwrap();
    let with_unknown = run_simulation(&request, &EngineConfig::default()).unwrap();
    let reference = run_simulation(&degenerate_request(), &EngineConfig::default()).unwrap();
    assert_eq!(
        with_unknown.result.per_share_value.mean,
        reference.result.per_share_value.mean
    );
}

#[test]
fn test_result_serializes_with_expected_shape() {
    let result = run_simulation(&degenerate_request(), &EngineConfig::default()).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert!(value["result"]["enterprise_value"]["p50"].is_number());
    assert!(value["result"]["histogram"].is_array());
    assert!(value["result"]["scenarios_sample"].is_array());
    assert!(value["result"]["terminal_value_pct"].is_number());
    assert_eq!(value["metadata"]["precision"], "ieee754_f64");
}
