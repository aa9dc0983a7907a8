mod config;
mod fetcher;
mod governor;
mod models;
mod output;
mod rate_limiter;
mod resolver;
mod rotator;
mod rpc;
mod scheduler;
mod wallets;

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::rpc::HttpTransport;
use crate::scheduler::BatchScheduler;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // RUST_LOG overrides, INFO otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("EVM balance checker starting...");

    // Fail fast on bad configuration or a missing address list
    let cfg = config::load()?;
    let addresses = wallets::load(&cfg.wallets_path)?;

    let transport = Arc::new(HttpTransport::new(cfg.engine.request_timeout())?);
    let scheduler = BatchScheduler::from_config(&cfg, transport);

    let report = scheduler.run(addresses).await;
    if report.is_empty() {
        warn!("Address list was empty, writing an empty report");
    }

    let path = output::write_report(&report, &cfg.thresholds, &cfg.report_dir)?;
    info!("Results saved to {}", path.display());

    Ok(())
}
