//! CLI module for the SRE agent
//!
//! - `serve`: HTTP API accepting alerts
//! - `run`: investigate a single alert from a file and print the recommendation

pub mod run;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// SRE Agent - plans, investigates and recommends fixes for operational alerts
#[derive(Parser)]
#[command(name = "sre-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Investigate one alert and print the recommendation JSON
    Run(run::RunArgs),
}

/// Load `.env` and layered configuration, then install logging
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    Ok(config)
}
