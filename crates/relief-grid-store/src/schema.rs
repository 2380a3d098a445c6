//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary disaster records, keyed by `disaster_id`.
    pub const DISASTERS: &str = "disasters";

    /// Index: disasters by position, keyed by `geohash || disaster_id`.
    pub const DISASTERS_BY_GEOHASH: &str = "disasters_by_geohash";

    /// Contact profiles, keyed by uid.
    pub const CONTACTS: &str = "contacts";

    /// Index: contacts by position, keyed by `geohash || uid`.
    pub const CONTACTS_BY_GEOHASH: &str = "contacts_by_geohash";

    /// Room message logs, keyed by `room_key || sequence_be`.
    pub const ROOM_LOGS: &str = "room_logs";

    /// Room head sequence numbers, keyed by `room_key`.
    pub const ROOM_HEADS: &str = "room_heads";

    /// Primary task records, keyed by `task_id`.
    pub const TASKS: &str = "tasks";

    /// Index: tasks by disaster, keyed by `disaster_id || task_id`.
    pub const TASKS_BY_DISASTER: &str = "tasks_by_disaster";

    /// Primary resource records, keyed by `resource_id`.
    pub const RESOURCES: &str = "resources";

    /// Index: resources by disaster, keyed by `disaster_id || resource_id`.
    pub const RESOURCES_BY_DISASTER: &str = "resources_by_disaster";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::DISASTERS,
        cf::DISASTERS_BY_GEOHASH,
        cf::CONTACTS,
        cf::CONTACTS_BY_GEOHASH,
        cf::ROOM_LOGS,
        cf::ROOM_HEADS,
        cf::TASKS,
        cf::TASKS_BY_DISASTER,
        cf::RESOURCES,
        cf::RESOURCES_BY_DISASTER,
    ]
}
