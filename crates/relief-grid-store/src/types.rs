//! Domain records persisted in the database.
//!
//! Disaster records are created by the report-ingestion pipeline and
//! accepted or archived by government action; tasks come from the task
//! generation pipeline; resources are created by government agents. This
//! crate persists them all and answers the prefix and log queries the
//! services are built on.

use chrono::{DateTime, Utc};
use relief_grid_core::{ActorId, DisasterId, GeoPoint, MessageId, ResourceId, Role, RoomId, TaskId};
use serde::{Deserialize, Serialize};

/// The kind of emergency a disaster report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    /// Fire.
    Fire,
    /// Flood.
    Flood,
    /// Earthquake.
    Earthquake,
    /// Storm.
    Storm,
    /// Anything else.
    Other,
}

/// Urgency assigned to a disaster report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Low urgency.
    Low,
    /// Medium urgency.
    Medium,
    /// High urgency.
    High,
}

/// Review status of a disaster record.
///
/// Reports start `Pending`; government acceptance moves them to `Active`
/// and rejection or closure moves them to `Archived`. Records are never
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterStatus {
    /// Submitted, awaiting review.
    Pending,
    /// Accepted and ongoing.
    Active,
    /// Rejected or closed.
    Archived,
}

/// A disaster record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterRecord {
    /// Unique identifier.
    pub disaster_id: DisasterId,
    /// Full-precision geohash of the location, used by the spatial index.
    pub geohash: String,
    /// Exact reported location.
    pub location: GeoPoint,
    /// Kind of emergency.
    pub emergency_type: EmergencyType,
    /// Assigned urgency.
    pub urgency: Urgency,
    /// Review status.
    pub status: DisasterStatus,
    /// When the report was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Estimated number of people affected.
    pub people_count: u32,
}

/// A participant profile with a last-known location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactProfile {
    /// The participant's uid.
    pub uid: ActorId,
    /// The role the participant acts under.
    pub role: Role,
    /// Full-precision geohash of the last reported position.
    pub geohash: String,
    /// Last reported position.
    pub location: GeoPoint,
    /// Display name, if the participant shared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Contact phone number, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// When the position was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One message in a room's append-only log.
///
/// Within a room, `sequence` is strictly increasing from 1 and defines the
/// total order; across rooms there is no ordering relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Content-derived identifier.
    pub message_id: MessageId,
    /// The room this message belongs to.
    pub room: RoomId,
    /// Who published it.
    pub author: ActorId,
    /// Message body; never empty.
    pub content: String,
    /// When the hub accepted it.
    pub created_at: DateTime<Utc>,
    /// Position in the room's log, starting at 1.
    pub sequence: u64,
}

/// Status of a task.
///
/// `Complete` and `Cancel` are absorbing: once a task leaves `Pending` no
/// further transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work not yet done.
    Pending,
    /// Work finished.
    Complete,
    /// Work called off.
    Cancel,
}

/// A shared work item attached to a disaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier.
    pub task_id: TaskId,
    /// The disaster this task belongs to.
    pub disaster_id: DisasterId,
    /// What needs doing.
    pub description: String,
    /// Current status.
    pub status: TaskStatus,
    /// Roles eligible to act on this task.
    pub eligible_roles: Vec<Role>,
    /// The actor behind the most recent valid transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_done_by: Option<ActorId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A bounded-capacity resource attached to a disaster.
///
/// Invariant: `availability <= capacity` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Unique identifier.
    pub resource_id: ResourceId,
    /// The disaster this resource belongs to.
    pub disaster_id: DisasterId,
    /// What the resource is (e.g. "shelter beds").
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
