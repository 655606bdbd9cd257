// moto_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// moto-sim: run a motorbike scenario headless and log what the bike does.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(
        short,
        long,
        default_value = "moto_sim/assets/scenarios/lean_turn.toml"
    )]
    pub scenario: PathBuf,

    /// Override the scenario's duration, in seconds.
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Keep the debug primitives updated every step.
    #[arg(long, default_value_t = false)]
    pub debug_vis: bool,

    /// Print the fully resolved scenario as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub dump_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_lean_turn_scenario() {
        let cli = Cli::parse_from(["moto-sim"]);
        assert!(cli.scenario.ends_with("lean_turn.toml"));
        assert_eq!(cli.duration, None);
        assert!(!cli.debug_vis && !cli.dump_config);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from(["moto-sim", "-s", "x.toml", "--duration", "2.5", "--debug-vis"]);
        assert_eq!(cli.scenario, PathBuf::from("x.toml"));
        assert_eq!(cli.duration, Some(2.5));
        assert!(cli.debug_vis);
    }
}
