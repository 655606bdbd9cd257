// moto_sim/src/main.rs

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use moto_sim::cli::Cli;
use moto_sim::error::SimError;
use moto_sim::simulation::config::load_scenario;
use moto_sim::simulation::runner::ScenarioRunner;

fn run(cli: &Cli) -> Result<(), SimError> {
    let mut config = load_scenario(&cli.scenario)?;
    if let Some(duration) = cli.duration {
        config.simulation.duration_seconds = duration;
    }
    if cli.debug_vis {
        config.simulation.debug_vis = true;
    }

    if cli.dump_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let summary = ScenarioRunner::new(config)?.run();
    println!("{:#?}", summary);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,moto_core=debug,moto_sim=debug")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
