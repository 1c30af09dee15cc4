use clap::Args;
use serde_json::Value;

use valsim_core::simulation::{
    summarize_distribution, DistributionFamily, DistributionParameter, EngineConfig,
};

/// Arguments for single-distribution sampling
#[derive(Args)]
pub struct SampleArgs {
    /// Distribution family: normal, triangular, uniform, or point
    #[arg(long, default_value = "normal")]
    pub family: String,

    /// Mean (mode for triangular), percentage points or raw units
    #[arg(long, allow_hyphen_values = true)]
    pub mean: f64,

    /// Standard deviation (normal only; default 10% of the mean)
    #[arg(long)]
    pub std: Option<f64>,

    /// Lower bound (triangular/uniform; derived from the mean if absent)
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<f64>,

    /// Upper bound (triangular/uniform; derived from the mean if absent)
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<f64>,

    /// Number of samples to draw
    #[arg(long, default_value_t = 10_000)]
    pub samples: u32,

    /// RNG seed for reproducible draws
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_sample(args: SampleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let param = DistributionParameter {
        family: DistributionFamily::from(args.family),
        mean: args.mean,
        std: args.std,
        min: args.min,
        max: args.max,
    };

    let result = summarize_distribution(&param, args.samples, args.seed, &EngineConfig::default())?;
    Ok(serde_json::to_value(result)?)
}
