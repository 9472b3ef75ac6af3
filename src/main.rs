//! Entry point for the pension engine binary.
//!
//! Running this binary starts an HTTP server that exposes the analysis
//! API.  The wage-cap table and the overlap strategy come from the
//! `PENSION_WAGE_CAPS` and `PENSION_OVERLAP_STRATEGY` environment
//! variables; the bind address from `PENSION_BIND_ADDR`.  Log verbosity
//! follows `RUST_LOG`.

use anyhow::Context;
use pension_engine::config::EngineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("loading engine configuration")?;
    let addr = std::env::var("PENSION_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    tracing::info!(strategy = ?config.overlap_strategy, "starting pension engine");
    pension_engine::api::serve(&addr, config).await
}
