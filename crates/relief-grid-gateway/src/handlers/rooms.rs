//! Room message endpoints: publish and history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relief_grid_core::RoomId;
use relief_grid_store::{Message, Store};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to publish a message.
#[derive(Debug, Deserialize)]
pub struct PublishBody {
    /// Message body.
    pub content: String,
}

/// One message on the wire.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Content-derived message ID.
    pub message_id: String,
    /// The room the message belongs to.
    pub room: String,
    /// Who published it.
    pub author: String,
    /// Message body.
    pub content: String,
    /// When the hub accepted it.
    pub created_at: DateTime<Utc>,
    /// Position in the room's log.
    pub sequence: u64,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.message_id.to_string(),
            room: message.room.to_string(),
            author: message.author.to_string(),
            content: message.content,
            created_at: message.created_at,
            sequence: message.sequence,
        }
    }
}

/// Response for a history read.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Messages in sequence order.
    pub messages: Vec<MessageResponse>,
}

/// Query parameters for a history read.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Return only messages with a sequence greater than this (default 0).
    #[serde(default)]
    pub since: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Publish a message to a room.
///
/// # Errors
///
/// Returns `BadRequest` for an unknown room id or empty content, and
/// a service error if the durable append fails.
pub async fn publish<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(room): Path<String>,
    user: AuthUser,
    Json(body): Json<PublishBody>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let room = parse_room(&room)?;
    let message = state.hub.publish(room, user.uid, &body.content).await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Read a room's backlog in sequence order.
///
/// # Errors
///
/// Returns `BadRequest` for an unknown room id, or a service error if the
/// store cannot be read.
pub async fn history<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(room): Path<String>,
    _user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let room = parse_room(&room)?;
    let mut messages = state.hub.history(room, query.since).await?;
    messages.truncate(state.config.history_limit);

    Ok(Json(HistoryResponse {
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

/// Parse a room identifier from a path segment.
pub(crate) fn parse_room(s: &str) -> Result<RoomId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid room: {s}")))
}
