//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Loads the config, wires up one adapter per configured backend, starts a
//! query session, and serves `CommandEnvelope` messages from stdin until
//! EOF or `runtime.stop`.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;

use pantry::host::stdio::run_stdio_bridge;
use pantry::{PantryConfig, QuerySession};
use pantry_search::Aggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("pantry-host starting");

    let config = PantryConfig::load_or_default(&PantryConfig::default_config_path())?;
    config.validate()?;

    let registry = pantry::catalog::build_registry(&config)?;
    if registry.is_empty() {
        tracing::warn!("no backends configured; every search will fail");
    }
    let aggregator = Arc::new(Aggregator::new(registry, config.search.clone())?);
    let session = QuerySession::new(aggregator, &config.session);

    run_stdio_bridge(session).await.map_err(|e| {
        tracing::error!(error = %e, "pantry-host exited with error");
        anyhow::anyhow!("pantry-host failed: {e}")
    })?;

    tracing::info!("pantry-host shut down cleanly");
    Ok(())
}
