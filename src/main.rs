//! Perfcore CLI entry point.

use clap::Parser;
use std::process::ExitCode;

use perfcore::cli::{self, Cli, Commands};
use perfcore::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            cli::handle_error(&err, cli.json);
            return ExitCode::FAILURE;
        }
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match &cli.command {
        Commands::Probe(args) => {
            cli::commands::probe::execute(args, config.orchestrator, cli.json).await
        }
        Commands::Config => cli::commands::config::execute(config, cli.json),
        Commands::Simulate(args) => cli::commands::simulate::execute(args, &config, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            cli::handle_error(&err, cli.json);
            ExitCode::FAILURE
        }
    }
}
