//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use relief_grid_store::Store;

use crate::auth::TokenVerifier;
use crate::handlers::{contacts, disasters, health, internal, resources, rooms, tasks, ws};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Proximity (authenticated)
/// - `GET /v1/disasters/nearby` - Disasters near a point
/// - `GET /v1/contacts/nearby` - Contacts near a point
/// - `POST /v1/locations` - Report the caller's location
///
/// ## Rooms (authenticated)
/// - `POST /v1/rooms/{room}/messages` - Publish a message
/// - `GET /v1/rooms/{room}/messages` - Read the backlog
/// - `GET /v1/rooms/{room}/ws` - Live subscription
///
/// ## Tasks (authenticated)
/// - `POST /v1/tasks/{task_id}/advance` - Advance a task
/// - `GET /v1/disasters/{disaster_id}/tasks` - List a disaster's tasks
///
/// ## Resources (authenticated)
/// - `POST /v1/disasters/{disaster_id}/resources` - Create a resource
/// - `GET /v1/disasters/{disaster_id}/resources` - List a disaster's resources
/// - `PUT /v1/resources/{resource_id}/availability` - Set availability
/// - `DELETE /v1/resources/{resource_id}` - Delete a resource
///
/// ## Internal (network-policy protected)
/// - `POST /internal/disasters` - Ingest a disaster report
pub fn create_router<S, V>(state: GatewayState<S, V>) -> Router
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    // Build the router
    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Proximity
        .route(
            "/v1/disasters/nearby",
            get(disasters::nearby_disasters::<S, V>),
        )
        .route(
            "/v1/contacts/nearby",
            get(contacts::nearby_contacts::<S, V>),
        )
        .route("/v1/locations", post(contacts::report_location::<S, V>))
        // Rooms
        .route(
            "/v1/rooms/{room}/messages",
            post(rooms::publish::<S, V>).get(rooms::history::<S, V>),
        )
        .route("/v1/rooms/{room}/ws", get(ws::websocket_handler::<S, V>))
        // Tasks
        .route(
            "/v1/tasks/{task_id}/advance",
            post(tasks::advance_task::<S, V>),
        )
        .route(
            "/v1/disasters/{disaster_id}/tasks",
            get(tasks::list_tasks::<S, V>),
        )
        // Resources
        .route(
            "/v1/disasters/{disaster_id}/resources",
            post(resources::create_resource::<S, V>).get(resources::list_resources::<S, V>),
        )
        .route(
            "/v1/resources/{resource_id}/availability",
            put(resources::set_availability::<S, V>),
        )
        .route(
            "/v1/resources/{resource_id}",
            axum::routing::delete(resources::delete_resource::<S, V>),
        )
        // Internal
        .route(
            "/internal/disasters",
            post(internal::ingest_disaster::<S, V>),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // For specific origins, parse them
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
