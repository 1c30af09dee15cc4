mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::sample::SampleArgs;
use commands::simulate::{PointArgs, SimulateArgs};

/// Stochastic DCF valuation from the command line
#[derive(Parser)]
#[command(
    name = "valsim",
    version,
    about = "Stochastic DCF valuation engine",
    long_about = "Runs Monte Carlo discounted-cash-flow valuations: draws \
                  thousands of independent scenarios over six uncertain \
                  assumptions, projects each cash-flow path, and reports \
                  percentile statistics and a histogram of the resulting \
                  per-share values."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Monte Carlo DCF simulation
    Simulate(SimulateArgs),
    /// Run one deterministic scenario at every assumption's mean
    Point(PointArgs),
    /// Draw from a single distribution and summarise the samples
    Sample(SampleArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Point(args) => commands::simulate::run_point(args),
        Commands::Sample(args) => commands::sample::run_sample(args),
        Commands::Version => {
            println!("valsim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
