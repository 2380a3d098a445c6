//! Resource endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relief_grid_core::ResourceId;
use relief_grid_store::{ResourceRecord, Store};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::handlers::tasks::parse_disaster_id;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to create a resource.
#[derive(Debug, Deserialize)]
pub struct CreateResourceBody {
    /// What the resource is (e.g. "shelter beds").
    pub name: String,
    /// Total capacity.
    pub capacity: u32,
    /// Initial availability (default: full capacity).
    #[serde(default)]
    pub availability: Option<u32>,
}

/// Request to replace a resource's availability.
#[derive(Debug, Deserialize)]
pub struct SetAvailabilityBody {
    /// The requested availability. Signed so that a negative submission is
    /// rejected explicitly instead of wrapping.
    pub availability: i64,
}

/// One resource on the wire.
#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    /// Resource ID.
    pub resource_id: String,
    /// The disaster this resource belongs to.
    pub disaster_id: String,
    /// What the resource is.
    pub name: String,
    /// Total capacity.
    pub capacity: u32,
    /// Currently available units.
    pub availability: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ResourceRecord> for ResourceResponse {
    fn from(resource: ResourceRecord) -> Self {
        Self {
            resource_id: resource.resource_id.to_string(),
            disaster_id: resource.disaster_id.to_string(),
            name: resource.name,
            capacity: resource.capacity,
            availability: resource.availability,
            created_at: resource.created_at,
            updated_at: resource.updated_at,
        }
    }
}

/// Response for a resource list.
#[derive(Debug, Serialize)]
pub struct ListResourcesResponse {
    /// Resources attached to the disaster.
    pub resources: Vec<ResourceResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a resource attached to a disaster. Government only.
///
/// # Errors
///
/// Returns `Forbidden` for non-government requesters and `BadRequest` if
/// the initial availability exceeds the capacity.
pub async fn create_resource<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(disaster_id): Path<String>,
    user: AuthUser,
    Json(body): Json<CreateResourceBody>,
) -> Result<(StatusCode, Json<ResourceResponse>), ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let disaster_id = parse_disaster_id(&disaster_id)?;
    let availability = body.availability.unwrap_or(body.capacity);

    let counter = Arc::clone(&state.resources);
    let resource = tokio::task::spawn_blocking(move || {
        counter.create(user.role, disaster_id, &body.name, body.capacity, availability)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok((StatusCode::CREATED, Json(resource.into())))
}

/// Replace a resource's availability. Government only.
///
/// Returns the canonical updated record so the caller observes the new
/// state without re-reading.
///
/// # Errors
///
/// Returns `Forbidden` for non-government requesters, `BadRequest` if the
/// value falls outside `0..=capacity`, and `NotFound` for a missing
/// resource.
pub async fn set_availability<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(resource_id): Path<String>,
    user: AuthUser,
    Json(body): Json<SetAvailabilityBody>,
) -> Result<Json<ResourceResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let resource_id = parse_resource_id(&resource_id)?;

    let counter = Arc::clone(&state.resources);
    let resource = tokio::task::spawn_blocking(move || {
        counter.set_availability(&resource_id, body.availability, user.role)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(resource.into()))
}

/// Delete a resource. Government only.
///
/// # Errors
///
/// Returns `Forbidden` for non-government requesters and `NotFound` for a
/// missing resource.
pub async fn delete_resource<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(resource_id): Path<String>,
    user: AuthUser,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let resource_id = parse_resource_id(&resource_id)?;

    let counter = Arc::clone(&state.resources);
    tokio::task::spawn_blocking(move || counter.delete(&resource_id, user.role))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(StatusCode::NO_CONTENT)
}

/// List all resources attached to a disaster.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_resources<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(disaster_id): Path<String>,
    _user: AuthUser,
) -> Result<Json<ListResourcesResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let disaster_id = parse_disaster_id(&disaster_id)?;

    let counter = Arc::clone(&state.resources);
    let resources = tokio::task::spawn_blocking(move || counter.list_for_disaster(&disaster_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ListResourcesResponse {
        resources: resources.into_iter().map(ResourceResponse::from).collect(),
    }))
}

/// Parse a resource ID from a path segment.
fn parse_resource_id(s: &str) -> Result<ResourceId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid resource ID: {s}")))
}
