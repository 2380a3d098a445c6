//! `RocksDB` storage layer for relief-grid.
//!
//! This crate is the durable-store boundary for the coordination core: it
//! persists disaster records, contact profiles, per-room message logs,
//! tasks, and resources using `RocksDB` with column families for efficient
//! prefix indexing.
//!
//! # Architecture
//!
//! The spatial indexes (`disasters_by_geohash`, `contacts_by_geohash`) key
//! records by their full-precision geohash so that a coarse proximity query
//! becomes a single prefix scan. Room logs key messages by
//! `room_key || sequence_be`, so a log read is an ordered range scan and
//! the head sequence survives restarts.
//!
//! # Example
//!
//! ```no_run
//! use relief_grid_store::{RocksStore, Store};
//! use relief_grid_core::RoomId;
//!
//! let store = RocksStore::open("/tmp/relief-grid-db").unwrap();
//! let backlog = store.read_log(&RoomId::Global, 0).unwrap();
//! assert!(backlog.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    ContactProfile, DisasterRecord, DisasterStatus, EmergencyType, Message, ResourceRecord,
    TaskRecord, TaskStatus, Urgency,
};

use relief_grid_core::{ActorId, DisasterId, ResourceId, RoomId, TaskId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing). Implementations
/// must provide read-your-writes consistency for a single room's log.
pub trait Store: Send + Sync {
    // =========================================================================
    // Disaster Operations
    // =========================================================================

    /// Insert or update a disaster record, maintaining the spatial index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_disaster(&self, disaster: &DisasterRecord) -> Result<()>;

    /// Get a disaster by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_disaster(&self, disaster_id: &DisasterId) -> Result<Option<DisasterRecord>>;

    /// List all disasters whose geohash starts with the given prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_disasters_by_prefix(&self, geohash_prefix: &str) -> Result<Vec<DisasterRecord>>;

    /// List every disaster record. Used to seed the in-memory proximity
    /// index at startup; prefer prefix queries elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_all_disasters(&self) -> Result<Vec<DisasterRecord>>;

    // =========================================================================
    // Contact Operations
    // =========================================================================

    /// Insert or update a contact profile, maintaining the spatial index.
    ///
    /// If the contact moved, the old spatial index entry is removed in the
    /// same write batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_contact(&self, contact: &ContactProfile) -> Result<()>;

    /// Get a contact profile by uid.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_contact(&self, uid: &ActorId) -> Result<Option<ContactProfile>>;

    /// List all contacts whose geohash starts with the given prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_contacts_by_prefix(&self, geohash_prefix: &str) -> Result<Vec<ContactProfile>>;

    /// List every contact profile. Used to seed the in-memory proximity
    /// index at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_all_contacts(&self) -> Result<Vec<ContactProfile>>;

    // =========================================================================
    // Room Log Operations
    // =========================================================================

    /// Append a message to its room's log and advance the room head, in a
    /// single atomic batch.
    ///
    /// The caller (the message hub) assigns sequence numbers; the store
    /// refuses to overwrite history.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StaleSequence` if the message's sequence is not
    /// past the room's current head.
    fn append_message(&self, message: &Message) -> Result<()>;

    /// The highest sequence number persisted for a room, or 0 if the room
    /// has no messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn last_sequence(&self, room: &RoomId) -> Result<u64>;

    /// Read a room's log in sequence order, starting after `since_sequence`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn read_log(&self, room: &RoomId, since_sequence: u64) -> Result<Vec<Message>>;

    // =========================================================================
    // Task Operations
    // =========================================================================

    /// Insert or update a task record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_task(&self, task: &TaskRecord) -> Result<()>;

    /// Get a task by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_task(&self, task_id: &TaskId) -> Result<Option<TaskRecord>>;

    /// List all tasks attached to a disaster.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_tasks_by_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<TaskRecord>>;

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Insert or update a resource record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_resource(&self, resource: &ResourceRecord) -> Result<()>;

    /// Get a resource by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_resource(&self, resource_id: &ResourceId) -> Result<Option<ResourceRecord>>;

    /// Delete a resource by ID, removing it from the disaster index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the resource doesn't exist.
    fn delete_resource(&self, resource_id: &ResourceId) -> Result<()>;

    /// List all resources attached to a disaster.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_resources_by_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<ResourceRecord>>;
}
