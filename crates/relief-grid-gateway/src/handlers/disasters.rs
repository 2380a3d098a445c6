//! Disaster proximity endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relief_grid_core::geo::{self, GeoPoint, COARSE_PRECISION};
use relief_grid_index::DEFAULT_MAX_AGE_SECS;
use relief_grid_store::{DisasterRecord, DisasterStatus, EmergencyType, Store, Urgency};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for a proximity search.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    /// Query latitude.
    pub lat: f64,
    /// Query longitude.
    pub lon: f64,
    /// Geohash prefix length for the match (default: coarse precision).
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// Freshness window in seconds (default: 7 days).
    #[serde(default = "default_max_age")]
    pub max_age: i64,
}

const fn default_precision() -> usize {
    COARSE_PRECISION
}

const fn default_max_age() -> i64 {
    DEFAULT_MAX_AGE_SECS
}

/// One disaster in a proximity result, with distance from the query point.
#[derive(Debug, Serialize)]
pub struct DisasterResponse {
    /// Disaster ID.
    pub disaster_id: String,
    /// Reported latitude.
    pub latitude: f64,
    /// Reported longitude.
    pub longitude: f64,
    /// Kind of emergency.
    pub emergency_type: EmergencyType,
    /// Assigned urgency.
    pub urgency: Urgency,
    /// Review status.
    pub status: DisasterStatus,
    /// Estimated number of people affected.
    pub people_count: u32,
    /// When the report was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Great-circle distance from the query point in meters.
    pub distance_meters: f64,
}

impl DisasterResponse {
    fn from_record(record: DisasterRecord, from: GeoPoint) -> Self {
        Self {
            disaster_id: record.disaster_id.to_string(),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            emergency_type: record.emergency_type,
            urgency: record.urgency,
            status: record.status,
            people_count: record.people_count,
            submitted_at: record.submitted_at,
            distance_meters: geo::distance_meters(from, record.location),
        }
    }
}

/// Response for a disaster proximity search.
#[derive(Debug, Serialize)]
pub struct NearbyDisastersResponse {
    /// Matching disasters, nearest first.
    pub disasters: Vec<DisasterResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Find disasters near a point, nearest first.
///
/// # Errors
///
/// Returns `BadRequest` for malformed coordinates or precision, or an
/// internal error if the store fails.
pub async fn nearby_disasters<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    _user: AuthUser,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyDisastersResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let point = GeoPoint::new(query.lat, query.lon)?;
    let ids = state
        .disaster_index
        .query_near(point, query.precision, query.max_age)?;

    let store = Arc::clone(&state.store);
    let records = tokio::task::spawn_blocking(move || {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = store.get_disaster(&id)? {
                records.push(record);
            }
        }
        Ok::<_, relief_grid_store::StoreError>(records)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let mut disasters: Vec<DisasterResponse> = records
        .into_iter()
        .map(|record| DisasterResponse::from_record(record, point))
        .collect();
    disasters.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    Ok(Json(NearbyDisastersResponse { disasters }))
}
