//! Internal API endpoints.
//!
//! These endpoints are used by the report-ingestion pipeline and other
//! services inside the deployment. They are NOT exposed externally and
//! don't require bearer authentication; network policy restricts who can
//! reach them.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use relief_grid_core::geo::{self, GeoPoint, STORAGE_PRECISION};
use relief_grid_core::DisasterId;
use relief_grid_store::{DisasterRecord, DisasterStatus, EmergencyType, Store, Urgency};

use crate::auth::TokenVerifier;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request body for ingesting a disaster report.
#[derive(Debug, Deserialize)]
pub struct IngestDisasterBody {
    /// Reported latitude.
    pub lat: f64,
    /// Reported longitude.
    pub lon: f64,
    /// Kind of emergency.
    pub emergency_type: EmergencyType,
    /// Assigned urgency.
    pub urgency: Urgency,
    /// Estimated number of people affected.
    #[serde(default)]
    pub people_count: u32,
}

/// Response for disaster ingestion.
#[derive(Debug, Serialize)]
pub struct IngestDisasterResponse {
    /// The new disaster's ID.
    pub disaster_id: String,
    /// Full-precision geohash assigned to the location.
    pub geohash: String,
    /// Review status the record starts in.
    pub status: DisasterStatus,
}

// =============================================================================
// Handlers
// =============================================================================

/// Ingest a disaster report from the pipeline.
///
/// Persists the record in `Pending` status and feeds the proximity index
/// so the disaster is immediately queryable.
///
/// # Errors
///
/// Returns `BadRequest` for malformed coordinates, or an internal error if
/// the store fails.
pub async fn ingest_disaster<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Json(body): Json<IngestDisasterBody>,
) -> Result<(StatusCode, Json<IngestDisasterResponse>), ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let point = GeoPoint::new(body.lat, body.lon)?;
    let now = Utc::now();

    let record = DisasterRecord {
        disaster_id: DisasterId::generate(),
        geohash: geo::encode(point, STORAGE_PRECISION)?,
        location: point,
        emergency_type: body.emergency_type,
        urgency: body.urgency,
        status: DisasterStatus::Pending,
        submitted_at: now,
        people_count: body.people_count,
    };

    let store = Arc::clone(&state.store);
    let stored = record.clone();
    tokio::task::spawn_blocking(move || store.put_disaster(&stored))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    state
        .disaster_index
        .upsert(record.disaster_id, point, now)?;

    tracing::info!(
        disaster_id = %record.disaster_id,
        geohash = %record.geohash,
        emergency_type = ?record.emergency_type,
        "Disaster report ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestDisasterResponse {
            disaster_id: record.disaster_id.to_string(),
            geohash: record.geohash,
            status: record.status,
        }),
    ))
}
