//! pricefeed-sim: runs the feeds keeper and one submitter per validator
//! against a scripted market.
//!
//! Usage: `pricefeed-sim [scenario.toml]`. The final prices and the last
//! relay payload are printed as JSON on stdout.

mod chain;
mod market;
mod scenario;
mod sim;

use std::path::PathBuf;

use tracing::{error, info};

use crate::scenario::Scenario;
use crate::sim::Simulation;

const DEFAULT_SCENARIO: &str = "crates/pricefeed-sim/scenarios/basic.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricefeed=info".parse()?),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENARIO));
    let scenario = Scenario::load(&path)?;
    info!(
        scenario = %path.display(),
        blocks = scenario.blocks,
        validators = scenario.validators.len(),
        "simulation starting"
    );

    let mut sim = Simulation::new(&scenario)?;
    tokio::select! {
        result = sim.run() => {
            if let Err(e) = result {
                error!("simulation error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping");
        }
    }

    let stats = sim.stats();
    info!(
        blocks = stats.blocks,
        confirmed = stats.confirmed_batches,
        failed = stats.failed_batches,
        missed = stats.missed_reports,
        "simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&sim.summary())?);
    Ok(())
}
