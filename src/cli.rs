use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Soil moisture index and drought cluster analysis.
#[derive(Parser)]
#[command(
    name = "smi",
    version,
    about = "Soil moisture index and drought cluster analysis"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline: SMI, drought indicator, clusters and SAD.
    Run(RunArgs),
    /// Estimate kernel bandwidths and write them for later runs.
    Bandwidth(RunArgs),
}

/// Arguments shared by the `run` and `bandwidth` subcommands.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "smi.toml")]
    pub config: PathBuf,

    /// Override input NetCDF path from config.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override output directory from config.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override the number of worker threads from config.
    #[arg(short, long)]
    pub threads: Option<usize>,
}
