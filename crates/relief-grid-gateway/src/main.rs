//! Relief Grid Gateway - HTTP/WebSocket API entry point.
//!
//! Configuration comes from the environment:
//!
//! - `LISTEN_ADDR` - listen address (default `0.0.0.0:8080`)
//! - `DATA_DIR` - RocksDB data directory (default `/data/relief-grid`)
//! - `TOKEN_SECRET` - HS256 shared secret for bearer tokens
//! - `DEV_MODE` - set to `true` to accept `test-token:<uid>:<role>` tokens
//!   instead of signed ones

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relief_grid_gateway::{
    create_router, GatewayConfig, GatewayState, HsVerifier, StaticVerifier,
};
use relief_grid_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relief_grid=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relief Grid Gateway");

    // Load configuration from environment
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/relief-grid".into());
    let dev_mode = std::env::var("DEV_MODE").is_ok_and(|v| v == "true");

    tracing::info!(
        listen_addr = %listen_addr,
        data_dir = %data_dir,
        dev_mode,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);

    let config = GatewayConfig {
        listen_addr: listen_addr.clone(),
        ..GatewayConfig::default()
    };

    // The two verifier paths build differently typed states, so each arm
    // runs the server to completion.
    if dev_mode {
        tracing::warn!("DEV MODE ENABLED - accepting unsigned test tokens");
        tracing::warn!("Use tokens in format: test-token:<uid>:<role>");

        let state = GatewayState::new(store, Arc::new(StaticVerifier), config);
        state.seed_indexes()?;
        serve(&listen_addr, create_router(state)).await
    } else {
        let secret = std::env::var("TOKEN_SECRET")
            .map_err(|_| "TOKEN_SECRET must be set unless DEV_MODE=true")?;

        let state = GatewayState::new(store, Arc::new(HsVerifier::new(secret.as_bytes())), config);
        state.seed_indexes()?;
        serve(&listen_addr, create_router(state)).await
    }
}

async fn serve(
    listen_addr: &str,
    app: axum::Router,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
