//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when only the HTTP surface is wanted. The workspace's
//! main `ward-run` binary does the same with `.env` loading and the default data directory.

use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_api_rest::{router, AppState};
use ward_core::config::collection_from_env_value;
use ward_core::constants::{
    DEFAULT_CENSUS_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_MORTALITY_COLLECTION,
};
use ward_core::{CensusService, CoreConfig, FileStore, SystemClock};

/// Main entry point for the ward REST API server.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `WARD_DATA_DIR`: Document store directory (default: "ward_data")
/// - `WARD_CENSUS_COLLECTION` / `WARD_MORTALITY_COLLECTION`: Collection names
/// - `API_KEY`: Shared key expected in `x-api-key`
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - `API_KEY` is unset or the collection names are invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ward_api_rest=info".parse()?)
                .add_directive("ward_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let api_key = std::env::var("API_KEY")
        .map_err(|_| anyhow::anyhow!("API_KEY not set in environment"))?;

    let data_dir = std::env::var("WARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let cfg = Arc::new(CoreConfig::new(
        PathBuf::from(data_dir),
        collection_from_env_value(
            std::env::var("WARD_CENSUS_COLLECTION").ok(),
            DEFAULT_CENSUS_COLLECTION,
        ),
        collection_from_env_value(
            std::env::var("WARD_MORTALITY_COLLECTION").ok(),
            DEFAULT_MORTALITY_COLLECTION,
        ),
    )?);

    let store = Arc::new(FileStore::new(cfg.data_dir()));
    let service = CensusService::new(cfg.clone(), store, Arc::new(SystemClock));
    let app = router(AppState::new(service, api_key));

    tracing::info!(
        "-- Starting ward REST API on {} (data in {})",
        addr,
        cfg.data_dir().display()
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
