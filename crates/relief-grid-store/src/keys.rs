//! Key encoding utilities for `RocksDB`.
//!
//! All index keys are designed to support efficient prefix scans. Spatial
//! index keys lead with the record's full-precision geohash, so a coarse
//! proximity query is a scan over the shared prefix.

use relief_grid_core::{ActorId, DisasterId, ResourceId, RoomId, TaskId};

/// Encode a disaster key (just the disaster ID bytes).
#[must_use]
pub fn disaster_key(disaster_id: &DisasterId) -> Vec<u8> {
    disaster_id.as_bytes().to_vec()
}

/// Encode a geohash-disaster index key: `geohash || disaster_id`.
#[must_use]
pub fn geo_disaster_key(geohash: &str, disaster_id: &DisasterId) -> Vec<u8> {
    let mut key = Vec::with_capacity(geohash.len() + 16);
    key.extend_from_slice(geohash.as_bytes());
    key.extend_from_slice(disaster_id.as_bytes());
    key
}

/// Extract the disaster ID from a geohash-disaster index key.
///
/// # Panics
///
/// Panics if the key is shorter than 16 bytes.
#[must_use]
pub fn extract_disaster_id_from_geo_key(key: &[u8]) -> DisasterId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[key.len() - 16..]);
    DisasterId::from_bytes(bytes)
}

/// Encode a contact key (the uid bytes).
#[must_use]
pub fn contact_key(uid: &ActorId) -> Vec<u8> {
    uid.as_str().as_bytes().to_vec()
}

/// Encode a geohash-contact index key: `geohash || uid`.
///
/// The geohash component is always [`relief_grid_core::geo::STORAGE_PRECISION`]
/// characters, so the uid can be recovered by slicing past it.
#[must_use]
pub fn geo_contact_key(geohash: &str, uid: &ActorId) -> Vec<u8> {
    let mut key = Vec::with_capacity(geohash.len() + uid.as_str().len());
    key.extend_from_slice(geohash.as_bytes());
    key.extend_from_slice(uid.as_str().as_bytes());
    key
}

/// Extract the uid from a geohash-contact index key.
#[must_use]
pub fn extract_uid_from_geo_key(key: &[u8]) -> Option<ActorId> {
    let tail = key.get(relief_grid_core::geo::STORAGE_PRECISION..)?;
    let uid = std::str::from_utf8(tail).ok()?;
    uid.parse().ok()
}

/// Encode a geohash prefix for spatial scans.
#[must_use]
pub fn geo_prefix(prefix: &str) -> Vec<u8> {
    prefix.as_bytes().to_vec()
}

/// Encode a room key. The global room and disaster rooms live under
/// distinct tag bytes so their log ranges can never collide.
#[must_use]
pub fn room_key(room: &RoomId) -> Vec<u8> {
    match room {
        RoomId::Global => vec![0x00],
        RoomId::Disaster(id) => {
            let mut key = Vec::with_capacity(17);
            key.push(0x01);
            key.extend_from_slice(id.as_bytes());
            key
        }
    }
}

/// Encode a log entry key: `room_key || sequence_be`.
///
/// Big-endian sequence bytes make lexicographic key order equal sequence
/// order within a room.
#[must_use]
pub fn log_key(room: &RoomId, sequence: u64) -> Vec<u8> {
    let mut key = room_key(room);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// Encode a task key (just the task ID bytes).
#[must_use]
pub fn task_key(task_id: &TaskId) -> Vec<u8> {
    task_id.as_bytes().to_vec()
}

/// Encode a disaster-task index key: `disaster_id || task_id`.
#[must_use]
pub fn disaster_task_key(disaster_id: &DisasterId, task_id: &TaskId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(disaster_id.as_bytes());
    key.extend_from_slice(task_id.as_bytes());
    key
}

/// Extract the task ID from a disaster-task index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_task_id_from_disaster_key(key: &[u8]) -> TaskId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    TaskId::from_bytes(bytes)
}

/// Encode a resource key (just the resource ID bytes).
#[must_use]
pub fn resource_key(resource_id: &ResourceId) -> Vec<u8> {
    resource_id.as_bytes().to_vec()
}

/// Encode a disaster-resource index key: `disaster_id || resource_id`.
#[must_use]
pub fn disaster_resource_key(disaster_id: &DisasterId, resource_id: &ResourceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(disaster_id.as_bytes());
    key.extend_from_slice(resource_id.as_bytes());
    key
}

/// Extract the resource ID from a disaster-resource index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_resource_id_from_disaster_key(key: &[u8]) -> ResourceId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    ResourceId::from_bytes(bytes)
}

/// Encode a disaster prefix for scanning tasks or resources by disaster.
#[must_use]
pub fn disaster_prefix(disaster_id: &DisasterId) -> Vec<u8> {
    disaster_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_disaster_key_roundtrip() {
        let id = DisasterId::from_bytes([3u8; 16]);
        let key = geo_disaster_key("tc3mqkw2d", &id);
        assert_eq!(key.len(), 9 + 16);
        assert_eq!(extract_disaster_id_from_geo_key(&key), id);
        assert!(key.starts_with(&geo_prefix("tc3m")));
    }

    #[test]
    fn geo_contact_key_roundtrip() {
        let uid: ActorId = "vol-17".parse().unwrap();
        let key = geo_contact_key("tc3mqkw2d", &uid);
        assert_eq!(extract_uid_from_geo_key(&key), Some(uid));
    }

    #[test]
    fn room_keys_are_disjoint() {
        let global = room_key(&RoomId::Global);
        let scoped = room_key(&RoomId::Disaster(DisasterId::from_bytes([0u8; 16])));
        assert_ne!(global[0], scoped[0]);
    }

    #[test]
    fn log_keys_sort_by_sequence() {
        let room = RoomId::Disaster(DisasterId::from_bytes([5u8; 16]));
        let k1 = log_key(&room, 1);
        let k2 = log_key(&room, 2);
        let k300 = log_key(&room, 300);
        assert!(k1 < k2);
        assert!(k2 < k300);
        assert!(k1.starts_with(&room_key(&room)));
    }

    #[test]
    fn disaster_task_key_roundtrip() {
        let disaster = DisasterId::from_bytes([1u8; 16]);
        let task = TaskId::from_bytes([2u8; 16]);
        let key = disaster_task_key(&disaster, &task);
        assert_eq!(key.len(), 32);
        assert_eq!(extract_task_id_from_disaster_key(&key), task);
        assert!(key.starts_with(&disaster_prefix(&disaster)));
    }

    #[test]
    fn disaster_resource_key_roundtrip() {
        let disaster = DisasterId::from_bytes([1u8; 16]);
        let resource = ResourceId::from_bytes([9u8; 16]);
        let key = disaster_resource_key(&disaster, &resource);
        assert_eq!(extract_resource_id_from_disaster_key(&key), resource);
    }
}
