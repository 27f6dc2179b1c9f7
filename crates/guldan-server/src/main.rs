//! Guldan: process entry point.

mod config;

use guldan_access::AccessService;
use guldan_db::{DbManager, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!("Starting Guldan...");

    let db = DbManager::connect(&config.database).await?;
    run_migrations(db.client()).await?;

    let service = AccessService::new(db.store(), config.access);
    info!(
        max_name_length = service.config().max_name_length,
        "Access service ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Guldan stopped.");
    Ok(())
}
