mod config;
mod resources;
mod scheduler;

use anyhow::{Context, Result};
use cloudmon_cloud::DriverRegistry;
use cloudmon_sink::influxdb::InfluxdbSink;
use scheduler::{CollectScheduler, GatewaySdkFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cloudmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/cloudmon.toml".to_string());
    let config = config::ServerConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {config_path}"))?;
    if config.tsdb_urls.is_empty() {
        tracing::warn!("No tsdb_urls configured, every send will fail");
    }

    let registry = DriverRegistry::default();
    tracing::info!(
        accounts = config.accounts.len(),
        providers = registry.providers().len(),
        "cloudmon starting"
    );

    let sink = InfluxdbSink::new(
        Duration::from_secs(config.sink_timeout_secs),
        config.sink_batch_size,
    )
    .context("Failed to build time-series sink")?;
    let sdk_factory = GatewaySdkFactory::new(Duration::from_secs(config.sdk_timeout_secs));

    let cancel = CancellationToken::new();
    let scheduler = CollectScheduler::new(
        Arc::new(config),
        Arc::new(registry),
        Arc::new(sink),
        Arc::new(sdk_factory),
        cancel.clone(),
    );
    let handle = tokio::spawn(async move { scheduler.run().await });

    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, cancelling collection");
    cancel.cancel();
    handle.await?;
    Ok(())
}
