//! CLI type definitions
//!
//! Clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{probe::ProbeArgs, simulate::SimulateArgs};

#[derive(Parser, Debug)]
#[command(name = "perfcore")]
#[command(about = "Perfcore - cache registry and request orchestration toolkit", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .perfcore/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a backend answers its health endpoint
    Probe(ProbeArgs),

    /// Print the effective configuration after all layers are merged
    Config,

    /// Replay a seeded synthetic workload against the cache registry and
    /// print the resulting performance report
    Simulate(SimulateArgs),
}
