//! Contact lookup and location reporting endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relief_grid_core::geo::{self, GeoPoint, COARSE_PRECISION, STORAGE_PRECISION};
use relief_grid_core::Role;
use relief_grid_index::DEFAULT_MAX_AGE_SECS;
use relief_grid_store::{ContactProfile, Store};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for a contact proximity search.
#[derive(Debug, Deserialize)]
pub struct NearbyContactsQuery {
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
    /// Exclude contacts with this role from the result.
    #[serde(default)]
    pub exclude_role: Option<Role>,
}

const fn default_precision() -> usize {
    COARSE_PRECISION
}

const fn default_max_age() -> i64 {
    DEFAULT_MAX_AGE_SECS
}

/// One contact in a proximity result.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    /// The contact's uid.
    pub uid: String,
    /// The contact's role.
    pub role: Role,
    /// Last reported latitude.
    pub latitude: f64,
    /// Last reported longitude.
    pub longitude: f64,
    /// Display name, if shared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Phone number, if shared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// When the position was last updated.
    pub updated_at: DateTime<Utc>,
    /// Great-circle distance from the query point in meters.
    pub distance_meters: f64,
}

impl ContactResponse {
    fn from_profile(profile: ContactProfile, from: GeoPoint) -> Self {
        Self {
            uid: profile.uid.to_string(),
            role: profile.role,
            latitude: profile.location.latitude,
            longitude: profile.location.longitude,
            display_name: profile.display_name,
            phone: profile.phone,
            updated_at: profile.updated_at,
            distance_meters: geo::distance_meters(from, profile.location),
        }
    }
}

/// Response for a contact proximity search.
#[derive(Debug, Serialize)]
pub struct NearbyContactsResponse {
    /// Matching contacts, nearest first.
    pub contacts: Vec<ContactResponse>,
}

/// Request to report the caller's current location.
#[derive(Debug, Deserialize)]
pub struct ReportLocationBody {
    /// Current latitude.
    pub lat: f64,
    /// Current longitude.
    pub lon: f64,
    /// Display name to share with nearby contacts.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Phone number to share with nearby contacts.
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Find contacts near a point, nearest first.
///
/// The requester's own profile is never included, and `exclude_role`
/// filters out an entire role (e.g. hide plain users from responders).
///
/// # Errors
///
/// Returns `BadRequest` for malformed coordinates or precision, or an
/// internal error if the store fails.
pub async fn nearby_contacts<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Query(query): Query<NearbyContactsQuery>,
) -> Result<Json<NearbyContactsResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let point = GeoPoint::new(query.lat, query.lon)?;
    let uids = state
        .contact_index
        .query_near(point, query.precision, query.max_age)?;

    let store = Arc::clone(&state.store);
    let profiles = tokio::task::spawn_blocking(move || {
        let mut profiles = Vec::with_capacity(uids.len());
        for uid in uids {
            if let Some(profile) = store.get_contact(&uid)? {
                profiles.push(profile);
            }
        }
        Ok::<_, relief_grid_store::StoreError>(profiles)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let mut contacts: Vec<ContactResponse> = profiles
        .into_iter()
        .filter(|p| p.uid != user.uid)
        .filter(|p| query.exclude_role != Some(p.role))
        .map(|profile| ContactResponse::from_profile(profile, point))
        .collect();
    contacts.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    Ok(Json(NearbyContactsResponse { contacts }))
}

/// Report the caller's current location.
///
/// Persists the contact profile and refreshes the in-memory proximity
/// index, returning the canonical stored profile.
///
/// # Errors
///
/// Returns `BadRequest` for malformed coordinates, or an internal error if
/// the store fails.
pub async fn report_location<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Json(body): Json<ReportLocationBody>,
) -> Result<Json<ContactResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let point = GeoPoint::new(body.lat, body.lon)?;
    let now = Utc::now();

    let profile = ContactProfile {
        uid: user.uid.clone(),
        role: user.role,
        geohash: geo::encode(point, STORAGE_PRECISION)?,
        location: point,
        display_name: body.display_name,
        phone: body.phone,
        updated_at: now,
    };

    let store = Arc::clone(&state.store);
    let stored = profile.clone();
    tokio::task::spawn_blocking(move || store.put_contact(&stored))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    state.contact_index.upsert(user.uid.clone(), point, now)?;

    tracing::debug!(uid = %user.uid, geohash = %profile.geohash, "Location reported");

    Ok(Json(ContactResponse::from_profile(profile, point)))
}
