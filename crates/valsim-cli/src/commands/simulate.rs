use clap::Args;
use serde_json::Value;

use valsim_core::simulation::{
    run_point_valuation, run_simulation, AssumptionSet, DistributionParameter, EngineConfig,
    ProjectionConstants, SimulationRequest,
};

use crate::input;

/// Arguments for a full Monte Carlo simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Base year revenue
    #[arg(long)]
    pub revenue: Option<f64>,

    /// Base year free cash flow (default: 10% of revenue)
    #[arg(long)]
    pub fcf: Option<f64>,

    /// Net debt for the equity bridge
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub net_debt: f64,

    /// Diluted shares outstanding
    #[arg(long)]
    pub shares: Option<f64>,

    /// Number of explicit forecast years
    #[arg(long, default_value_t = 5)]
    pub years: u32,

    /// Number of Monte Carlo scenarios
    #[arg(long, default_value_t = 10_000)]
    pub scenarios: u32,

    /// Mean revenue growth, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub growth: Option<f64>,

    /// Mean EBITDA margin, percentage points
    #[arg(long)]
    pub margin: Option<f64>,

    /// Mean capex as a share of revenue, percentage points
    #[arg(long)]
    pub capex: Option<f64>,

    /// Mean NWC-to-revenue delta, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub nwc_delta: Option<f64>,

    /// Mean WACC, percentage points
    #[arg(long)]
    pub wacc: Option<f64>,

    /// Mean terminal growth, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub terminal_growth: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for a deterministic point valuation
#[derive(Args)]
pub struct PointArgs {
    /// Path to a JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Base year revenue
    #[arg(long)]
    pub revenue: Option<f64>,

    /// Net debt for the equity bridge
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub net_debt: f64,

    /// Diluted shares outstanding
    #[arg(long)]
    pub shares: Option<f64>,

    /// Number of explicit forecast years
    #[arg(long, default_value_t = 5)]
    pub years: u32,

    /// Revenue growth, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub growth: Option<f64>,

    /// EBITDA margin, percentage points
    #[arg(long)]
    pub margin: Option<f64>,

    /// Capex as a share of revenue, percentage points
    #[arg(long)]
    pub capex: Option<f64>,

    /// NWC-to-revenue delta, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub nwc_delta: Option<f64>,

    /// WACC, percentage points
    #[arg(long)]
    pub wacc: Option<f64>,

    /// Terminal growth, percentage points
    #[arg(long, allow_hyphen_values = true)]
    pub terminal_growth: Option<f64>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = if let Some(ref path) = args.input {
        input::read_json(path)?
    } else if let Some(data) = input::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        SimulationRequest {
            base_year_revenue: require(args.revenue, "--revenue")?,
            base_year_fcf: args.fcf,
            net_debt: args.net_debt,
            shares_outstanding: require(args.shares, "--shares")?,
            forecast_years: args.years,
            n_scenarios: args.scenarios,
            assumptions: assumptions_from_means(
                args.growth,
                args.margin,
                args.capex,
                args.nwc_delta,
                args.wacc,
                args.terminal_growth,
            )?,
            seed: args.seed,
            constants: ProjectionConstants::default(),
        }
    };

    let result = run_simulation(&request, &EngineConfig::default())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_point(args: PointArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = if let Some(ref path) = args.input {
        input::read_json(path)?
    } else if let Some(data) = input::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        SimulationRequest {
            base_year_revenue: require(args.revenue, "--revenue")?,
            base_year_fcf: None,
            net_debt: args.net_debt,
            shares_outstanding: require(args.shares, "--shares")?,
            forecast_years: args.years,
            n_scenarios: 1,
            assumptions: assumptions_from_means(
                args.growth,
                args.margin,
                args.capex,
                args.nwc_delta,
                args.wacc,
                args.terminal_growth,
            )?,
            seed: None,
            constants: ProjectionConstants::default(),
        }
    };

    let result = run_point_valuation(&request)?;
    Ok(serde_json::to_value(result)?)
}

fn require(value: Option<f64>, flag: &str) -> Result<f64, String> {
    value.ok_or_else(|| format!("{flag} is required (or provide --input)"))
}

/// Build a normal-family assumption set from the six mean flags. Detailed
/// per-assumption families and spreads require a JSON request.
fn assumptions_from_means(
    growth: Option<f64>,
    margin: Option<f64>,
    capex: Option<f64>,
    nwc_delta: Option<f64>,
    wacc: Option<f64>,
    terminal_growth: Option<f64>,
) -> Result<AssumptionSet, String> {
    fn normal_mean(value: Option<f64>, flag: &str) -> Result<DistributionParameter, String> {
        let mean = value.ok_or_else(|| format!("{flag} is required (or provide --input)"))?;
        Ok(DistributionParameter {
            family: valsim_core::simulation::DistributionFamily::Normal,
            mean,
            std: None,
            min: None,
            max: None,
        })
    }

    Ok(AssumptionSet {
        revenue_growth: normal_mean(growth, "--growth")?,
        ebitda_margin: normal_mean(margin, "--margin")?,
        capex_to_revenue: normal_mean(capex, "--capex")?,
        nwc_to_revenue_delta: normal_mean(nwc_delta, "--nwc-delta")?,
        wacc: normal_mean(wacc, "--wacc")?,
        terminal_growth: normal_mean(terminal_growth, "--terminal-growth")?,
    })
}
