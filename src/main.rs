use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ward_api_rest::{AppState, router};
use ward_core::config::collection_from_env_value;
use ward_core::constants::{
    DEFAULT_CENSUS_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_MORTALITY_COLLECTION,
};
use ward_core::{CensusService, CoreConfig, DocumentStore, FileStore, MemoryStore, SystemClock};

/// Main entry point for the ward census service.
///
/// Resolves configuration once, then serves the REST API (with Swagger UI at `/swagger-ui`)
/// until interrupted.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARD_DATA_DIR`: Directory for the file-backed store (default: "ward_data"). Set it to an
///   empty value to keep records in memory only.
/// - `WARD_CENSUS_COLLECTION`: Live census collection (default: "patients")
/// - `WARD_MORTALITY_COLLECTION`: Mortality archive collection (default: "mortality_records")
/// - `API_KEY`: API key expected in the `x-api-key` header
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ward=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let api_key = std::env::var("API_KEY")
        .map_err(|_| anyhow::anyhow!("API_KEY not set in environment"))?;

    let data_dir = std::env::var("WARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let cfg = Arc::new(CoreConfig::new(
        PathBuf::from(&data_dir),
        collection_from_env_value(
            std::env::var("WARD_CENSUS_COLLECTION").ok(),
            DEFAULT_CENSUS_COLLECTION,
        ),
        collection_from_env_value(
            std::env::var("WARD_MORTALITY_COLLECTION").ok(),
            DEFAULT_MORTALITY_COLLECTION,
        ),
    )?);

    let store: Arc<dyn DocumentStore> = if data_dir.trim().is_empty() {
        tracing::warn!("WARD_DATA_DIR is empty; records are kept in memory only");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("++ Using data directory {}", cfg.data_dir().display());
        Arc::new(FileStore::new(cfg.data_dir()))
    };

    let service = CensusService::new(cfg.clone(), store, Arc::new(SystemClock));
    let app = router(AppState::new(service, api_key));

    tracing::info!("++ Starting ward REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
