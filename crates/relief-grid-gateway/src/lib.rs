//! HTTP and WebSocket gateway for the relief-grid coordination core.
//!
//! This crate provides the public-facing API over the core services:
//!
//! - Bearer-token authentication (the identity provider is external)
//! - Proximity queries over disasters and contacts
//! - Room messaging: publish, history, and live WebSocket subscriptions
//! - Role-gated task and resource mutations
//! - The internal report-ingestion boundary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relief_grid_gateway::{create_router, GatewayConfig, GatewayState, HsVerifier};
//! use relief_grid_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/relief-grid")?);
//! let verifier = Arc::new(HsVerifier::new(b"shared-secret"));
//!
//! let state = GatewayState::new(store, verifier, GatewayConfig::default());
//! state.seed_indexes()?;
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::{AuthUser, HsVerifier, StaticVerifier, TokenVerifier};
