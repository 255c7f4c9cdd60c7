mod cli;
mod config;
mod run;

use anyhow::Result;
use clap::Parser;
use engine_logging::LogDestination;
use log::LevelFilter;

use crate::cli::Cli;
use crate::config::RunConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::load(cli.config.as_deref())?.with_overrides(&cli);

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    run::run(&config, cli.skip_preflight).await
}
