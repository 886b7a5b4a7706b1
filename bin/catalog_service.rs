//! # Catalog Service
//!
//! Continuous service that builds the enriched token catalog and refreshes
//! it in the background (configurable via `enrichment.refresh_interval_seconds`).
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin catalog_service
//! ```
//!
//! Press Ctrl+C to stop gracefully.

use anyhow::Result;
use cspr_market_sdk::{metrics, ResolutionOrchestrator, Settings};
use tokio::signal;
use tokio::time::{interval, Duration};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    #[cfg(feature = "observability")]
    {
        tracing_subscriber::fmt().json().init();
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .install()
            .expect("failed to install Prometheus exporter");
    }
    #[cfg(not(feature = "observability"))]
    env_logger::init();

    metrics::describe_metrics();

    println!("🚀 Starting Catalog Service");
    println!("═══════════════════════════════════════════════════════════════════\n");

    // 1. Load settings
    let settings = Settings::new()?;
    let refresh_interval = Duration::from_secs(settings.enrichment.refresh_interval_seconds);
    println!("✅ Settings loaded");

    // 2. Build the orchestrator (adapters, caches, rate feed)
    let orchestrator = ResolutionOrchestrator::new(settings)?;
    println!("✅ Orchestrator ready");

    // 3. Initial catalog build
    let catalog = orchestrator.list_all().await;
    println!("✅ Initial catalog built: {} tokens\n", catalog.len());

    // 4. Refresh loop until Ctrl+C
    let mut ticker = interval(refresh_interval);
    ticker.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let count = orchestrator.rebuild_catalog().await.len();
                println!("🔄 Catalog refreshed: {} tokens", count);
            }
            _ = signal::ctrl_c() => {
                println!("\n🛑 Ctrl+C received, shutting down");
                break;
            }
        }
    }

    Ok(())
}
