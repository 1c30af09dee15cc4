pub mod assumptions;
pub mod engine;
pub mod scenario;
pub mod stats;

pub use assumptions::{
    sample, AssumptionDraw, AssumptionSet, DistributionFamily, DistributionParameter,
};
pub use engine::{
    run_point_valuation, run_simulation, run_simulation_with_cancel, summarize_distribution,
    DistributionSummary, EngineConfig, SimulationRequest,
};
pub use scenario::{run_scenario, ProjectionConstants, ScenarioOutcome};
pub use stats::{aggregate, HistogramBin, SimulationResult, ValueStatistics};
