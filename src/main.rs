//! ERP attendance - token-protected attendance API for a college ERP portal

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use erp_attendance::api;
use erp_attendance::cli::{Cli, Commands, print_attendance};
use erp_attendance::config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        Config::load_at(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply(cli.overrides());

    match cli.command {
        Commands::Serve { .. } => api::serve(&config).await?,
        Commands::Attendance { username, password } => {
            print_attendance(&config, &username, &password).await?
        }
    }

    Ok(())
}
