//! equity-planner: run the vesting, tax, scenario and recommendation pipeline
//! over a JSON plan file and print the report as JSON.
//!
//! Usage:
//!   cargo run -p equity-planner -- plans/sample.json
//!   EQUITY_PLAN_PATH=plans/sample.json cargo run -p equity-planner

mod config;
mod plan;

use anyhow::{Context, Result};
use std::path::PathBuf;

use config::PlannerConfig;
use plan::{EquityPlan, Planner};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "equity_planner=info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "equity_planner=info".into()),
            )
            .init();
    }

    let config = PlannerConfig::from_env()?;

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.plan_path.clone())
        .context("no plan file: pass a path or set EQUITY_PLAN_PATH")?;

    tracing::info!(path = %path.display(), "Loading plan");
    let plan = EquityPlan::load(&path)?;

    let report = Planner::from_config(&config)
        .run(&plan)
        .with_context(|| format!("failed to evaluate plan {}", path.display()))?;

    let output = if config.pretty_json {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", output);

    Ok(())
}
