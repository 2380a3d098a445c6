//! Task endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relief_grid_core::{DisasterId, Role, TaskId};
use relief_grid_store::{Store, TaskRecord, TaskStatus};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to advance a task.
#[derive(Debug, Deserialize)]
pub struct AdvanceBody {
    /// Target status.
    pub status: TaskStatus,
}

/// One task on the wire.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    /// Task ID.
    pub task_id: String,
    /// The disaster this task belongs to.
    pub disaster_id: String,
    /// What needs doing.
    pub description: String,
    /// Current status.
    pub status: TaskStatus,
    /// Roles eligible to act on this task.
    pub eligible_roles: Vec<Role>,
    /// The actor behind the most recent valid transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_done_by: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRecord> for TaskResponse {
    fn from(task: TaskRecord) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            disaster_id: task.disaster_id.to_string(),
            description: task.description,
            status: task.status,
            eligible_roles: task.eligible_roles,
            action_done_by: task.action_done_by.map(|actor| actor.to_string()),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Response for a task list.
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    /// Tasks attached to the disaster.
    pub tasks: Vec<TaskResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Advance a task's status on behalf of the authenticated actor.
///
/// # Errors
///
/// Returns `Forbidden` for role violations, `Conflict` for state-machine
/// violations, and `NotFound` for a missing task.
pub async fn advance_task<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(task_id): Path<String>,
    user: AuthUser,
    Json(body): Json<AdvanceBody>,
) -> Result<Json<TaskResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let task_id = parse_task_id(&task_id)?;

    let ledger = Arc::clone(&state.tasks);
    let task = tokio::task::spawn_blocking(move || {
        ledger.advance(&task_id, user.role, body.status, &user.uid)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(task.into()))
}

/// List all tasks attached to a disaster.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_tasks<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(disaster_id): Path<String>,
    _user: AuthUser,
) -> Result<Json<ListTasksResponse>, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let disaster_id = parse_disaster_id(&disaster_id)?;

    let ledger = Arc::clone(&state.tasks);
    let tasks = tokio::task::spawn_blocking(move || ledger.list_for_disaster(&disaster_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ListTasksResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// Parse a task ID from a path segment.
fn parse_task_id(s: &str) -> Result<TaskId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid task ID: {s}")))
}

/// Parse a disaster ID from a path segment.
pub(crate) fn parse_disaster_id(s: &str) -> Result<DisasterId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid disaster ID: {s}")))
}
