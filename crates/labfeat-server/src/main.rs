//! labfeat ETL HTTP Server
//!
//! Exposes the ETL chain behind three endpoints: an index page, a trigger
//! endpoint, and a results endpoint.

use anyhow::Result;
use labfeat_etl::EtlService;
use labfeat_server::api;
use labfeat_server::config::ServerConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing()?;

    // Load configuration
    let config = ServerConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    // Build the ETL service
    let service = EtlService::new(
        config.data_dir.clone(),
        config.database.clone(),
        config.schema.clone(),
        config.table.clone(),
    );

    // Create router
    let app = api::create_router(Arc::new(service));

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("✓ Server listening on http://{}", addr);
    info!("  Index: http://{}/", addr);
    info!("  Trigger ETL: http://{}/trigger-etl", addr);
    info!("  ETL results: http://{}/etl-results", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "labfeat_server=info,labfeat_etl=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
