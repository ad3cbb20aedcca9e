use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Optimise the dispatch of the scenario's device and derive the bid schedule.
    Plan(PlanArgs),

    /// Print the scenario's price forecast.
    Forecast(ForecastArgs),
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Scenario file.
    #[clap(long, env = "SCENARIO_PATH", default_value = "scenario.toml")]
    pub scenario: PathBuf,

    /// Write the resulting bid schedule as JSON.
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Roll the device through the planned dispatch and report its final energy
    /// content.
    #[clap(long)]
    pub settle: bool,
}

#[derive(Parser)]
pub struct ForecastArgs {
    /// Scenario file.
    #[clap(long, env = "SCENARIO_PATH", default_value = "scenario.toml")]
    pub scenario: PathBuf,
}
