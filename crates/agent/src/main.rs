//! Carbon agent - carbon-intensity resolution and time-shift advisory service
//!
//! Refreshes every configured region on a fixed interval and serves the
//! resulting table, summary, forecast and advice over HTTP.

use anyhow::{Context, Result};
use carbon_agent::{api, config::AgentConfig};
use carbon_lib::{
    advisor::TimeShiftAdvisor,
    health::HealthRegistry,
    observability::StructuredLogger,
    providers::ProviderSet,
    refresh::{RefreshLoop, Refresher, RegionTable},
    resolver::SourceResolver,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = AgentConfig::load()?;
    let regions = config.regions();
    info!(
        instance = %config.instance,
        regions = regions.len(),
        reference_region = %config.reference_region,
        "Agent configured"
    );

    let providers =
        ProviderSet::from_settings(&config.providers).context("Failed to build provider clients")?;
    let resolver = Arc::new(SourceResolver::new(providers, config.reference_region.clone()));

    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new(config.instance.clone());
    let refresher = Arc::new(Refresher::new(
        resolver,
        regions,
        RegionTable::new(),
        health_registry.clone(),
        logger.clone(),
    ));
    refresher.register_health().await;

    logger.log_startup(AGENT_VERSION, refresher.regions().len(), &config.reference_region);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let refresh_loop = RefreshLoop::new(refresher.clone(), config.refresh_config());
    let refresh_handle = tokio::spawn(refresh_loop.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(
        refresher,
        TimeShiftAdvisor::new(config.advisor),
        health_registry,
        logger.clone(),
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = refresh_handle.await {
        error!(error = %e, "Refresh loop task failed");
    }
    info!("Shutting down");

    Ok(())
}
