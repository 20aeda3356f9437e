use clap::Parser;
use pretty_env_logger::env_logger;
use pretty_env_logger::env_logger::Env;

use hiccup_meter::config::cli::Cli;
use hiccup_meter::config::Configuration;
use hiccup_meter::orchestrator;

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::from_env(Env::default().default_filter_or(default_level)).init();

    let process_start_ms = hiccup_meter::clock::MonotonicClock::new().wall_ms();

    let config = match Configuration::from_cli(cli, process_start_ms) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hiccup-meter: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = orchestrator::run(config) {
        eprintln!("hiccup-meter: {}", e);
        std::process::exit(2);
    }
}
