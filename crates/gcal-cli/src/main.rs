//! gcal CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use gcal_core::{TracingConfig, init_tracing};

use gcal_cli::cli::Cli;
use gcal_cli::container::Services;
use gcal_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut services = Services::from_cli(&cli)?;
    gcal_cli::commands::run(&mut services, cli.command).await
}
