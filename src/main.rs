mod analysis;
mod api;
mod config;
mod db;
mod error;
mod ingest;
mod stats;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::DrawStore;
use crate::error::Result;
use crate::ingest::{AutoUpdater, Crawler, MinhNgocSource};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = DrawStore::connect(&cfg.db_path).await?;
    info!("{} draws stored", store.count_draws().await?);

    // --- Ingestion ---
    let health = Arc::new(HealthState::new());
    let source = Arc::new(MinhNgocSource::new(&cfg)?);
    let crawler = Arc::new(Crawler::new(
        source,
        store.clone(),
        Arc::clone(&health),
        Duration::from_millis(cfg.crawl_delay_ms),
    ));

    if cfg.auto_update_interval_secs > 0 {
        let updater = AutoUpdater::new(Arc::clone(&crawler), cfg.auto_update_interval_secs);
        tokio::spawn(async move { updater.run().await });
        info!("Auto-update every {}s from {}", cfg.auto_update_interval_secs, cfg.source_base_url);
    } else {
        info!("Auto-update disabled (AUTO_UPDATE_INTERVAL_SECS=0)");
    }

    // HTTP API server
    let api_state = ApiState {
        store,
        crawler,
        health,
        analysis_latency: Arc::new(LatencyStats::new()),
        dashboard_latency: Arc::new(LatencyStats::new()),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
