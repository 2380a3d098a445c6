//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use relief_grid_core::{ActorId, DisasterId, ResourceId, RoomId, TaskId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{ContactProfile, DisasterRecord, Message, ResourceRecord, TaskRecord};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(column_families = all_column_families().len(), "RocksDB opened");

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Scan an index column family for keys sharing a prefix, yielding keys.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let handle = self.cf(cf_name)?;

        let mut found = Vec::new();
        let iter = self.db.iterator_cf(
            &handle,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(prefix) {
                break;
            }

            found.push(key);
        }

        Ok(found)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Disaster Operations
    // =========================================================================

    fn put_disaster(&self, disaster: &DisasterRecord) -> Result<()> {
        let cf_disasters = self.cf(cf::DISASTERS)?;
        let cf_by_geo = self.cf(cf::DISASTERS_BY_GEOHASH)?;

        let primary_key = keys::disaster_key(&disaster.disaster_id);
        let geo_key = keys::geo_disaster_key(&disaster.geohash, &disaster.disaster_id);
        let value = Self::serialize(disaster)?;

        // If the record exists under a different geohash, drop the old
        // spatial index entry in the same batch.
        let old_geohash = self
            .db
            .get_cf(&cf_disasters, &primary_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize::<DisasterRecord>(&data))
            .transpose()?
            .map(|d| d.geohash);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_disasters, &primary_key, &value);

        if let Some(old) = old_geohash {
            if old != disaster.geohash {
                let old_geo_key = keys::geo_disaster_key(&old, &disaster.disaster_id);
                batch.delete_cf(&cf_by_geo, &old_geo_key);
            }
        }
        batch.put_cf(&cf_by_geo, &geo_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_disaster(&self, disaster_id: &DisasterId) -> Result<Option<DisasterRecord>> {
        let handle = self.cf(cf::DISASTERS)?;
        let key = keys::disaster_key(disaster_id);

        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_disasters_by_prefix(&self, geohash_prefix: &str) -> Result<Vec<DisasterRecord>> {
        let prefix = keys::geo_prefix(geohash_prefix);
        let index_keys = self.scan_prefix(cf::DISASTERS_BY_GEOHASH, &prefix)?;

        let mut disasters = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let disaster_id = keys::extract_disaster_id_from_geo_key(&key);
            if let Some(disaster) = self.get_disaster(&disaster_id)? {
                disasters.push(disaster);
            }
        }

        Ok(disasters)
    }

    fn list_all_disasters(&self) -> Result<Vec<DisasterRecord>> {
        let handle = self.cf(cf::DISASTERS)?;

        let mut disasters = Vec::new();
        let iter = self.db.iterator_cf(&handle, IteratorMode::Start);

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            disasters.push(Self::deserialize(&value)?);
        }

        Ok(disasters)
    }

    // =========================================================================
    // Contact Operations
    // =========================================================================

    fn put_contact(&self, contact: &ContactProfile) -> Result<()> {
        let cf_contacts = self.cf(cf::CONTACTS)?;
        let cf_by_geo = self.cf(cf::CONTACTS_BY_GEOHASH)?;

        let primary_key = keys::contact_key(&contact.uid);
        let geo_key = keys::geo_contact_key(&contact.geohash, &contact.uid);
        let value = Self::serialize(contact)?;

        // Contacts move; migrate the spatial index entry atomically.
        let old_geohash = self
            .db
            .get_cf(&cf_contacts, &primary_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize::<ContactProfile>(&data))
            .transpose()?
            .map(|c| c.geohash);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_contacts, &primary_key, &value);

        if let Some(old) = old_geohash {
            if old != contact.geohash {
                let old_geo_key = keys::geo_contact_key(&old, &contact.uid);
                batch.delete_cf(&cf_by_geo, &old_geo_key);
            }
        }
        batch.put_cf(&cf_by_geo, &geo_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_contact(&self, uid: &ActorId) -> Result<Option<ContactProfile>> {
        let handle = self.cf(cf::CONTACTS)?;
        let key = keys::contact_key(uid);

        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_contacts_by_prefix(&self, geohash_prefix: &str) -> Result<Vec<ContactProfile>> {
        let prefix = keys::geo_prefix(geohash_prefix);
        let index_keys = self.scan_prefix(cf::CONTACTS_BY_GEOHASH, &prefix)?;

        let mut contacts = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let Some(uid) = keys::extract_uid_from_geo_key(&key) else {
                continue;
            };
            if let Some(contact) = self.get_contact(&uid)? {
                contacts.push(contact);
            }
        }

        Ok(contacts)
    }

    fn list_all_contacts(&self) -> Result<Vec<ContactProfile>> {
        let handle = self.cf(cf::CONTACTS)?;

        let mut contacts = Vec::new();
        let iter = self.db.iterator_cf(&handle, IteratorMode::Start);

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            contacts.push(Self::deserialize(&value)?);
        }

        Ok(contacts)
    }

    // =========================================================================
    // Room Log Operations
    // =========================================================================

    fn append_message(&self, message: &Message) -> Result<()> {
        let cf_logs = self.cf(cf::ROOM_LOGS)?;
        let cf_heads = self.cf(cf::ROOM_HEADS)?;

        let head = self.last_sequence(&message.room)?;
        if message.sequence <= head {
            return Err(StoreError::StaleSequence {
                got: message.sequence,
                head,
            });
        }

        let log_key = keys::log_key(&message.room, message.sequence);
        let head_key = keys::room_key(&message.room);
        let value = Self::serialize(message)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_logs, &log_key, &value);
        batch.put_cf(&cf_heads, &head_key, message.sequence.to_be_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn last_sequence(&self, room: &RoomId) -> Result<u64> {
        let handle = self.cf(cf::ROOM_HEADS)?;
        let key = keys::room_key(room);

        let head = self
            .db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .and_then(|data| data.as_slice().try_into().ok().map(u64::from_be_bytes))
            .unwrap_or(0);

        Ok(head)
    }

    fn read_log(&self, room: &RoomId, since_sequence: u64) -> Result<Vec<Message>> {
        let handle = self.cf(cf::ROOM_LOGS)?;
        let room_prefix = keys::room_key(room);
        let start = keys::log_key(room, since_sequence.saturating_add(1));

        let mut messages = Vec::new();
        let iter = self.db.iterator_cf(
            &handle,
            IteratorMode::From(&start, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&room_prefix) {
                break;
            }

            messages.push(Self::deserialize(&value)?);
        }

        Ok(messages)
    }

    // =========================================================================
    // Task Operations
    // =========================================================================

    fn put_task(&self, task: &TaskRecord) -> Result<()> {
        let cf_tasks = self.cf(cf::TASKS)?;
        let cf_by_disaster = self.cf(cf::TASKS_BY_DISASTER)?;

        let task_key = keys::task_key(&task.task_id);
        let index_key = keys::disaster_task_key(&task.disaster_id, &task.task_id);
        let value = Self::serialize(task)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tasks, &task_key, &value);
        batch.put_cf(&cf_by_disaster, &index_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_task(&self, task_id: &TaskId) -> Result<Option<TaskRecord>> {
        let handle = self.cf(cf::TASKS)?;
        let key = keys::task_key(task_id);

        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_tasks_by_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<TaskRecord>> {
        let prefix = keys::disaster_prefix(disaster_id);
        let index_keys = self.scan_prefix(cf::TASKS_BY_DISASTER, &prefix)?;

        let mut tasks = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let task_id = keys::extract_task_id_from_disaster_key(&key);
            if let Some(task) = self.get_task(&task_id)? {
                tasks.push(task);
            }
        }

        Ok(tasks)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    fn put_resource(&self, resource: &ResourceRecord) -> Result<()> {
        let cf_resources = self.cf(cf::RESOURCES)?;
        let cf_by_disaster = self.cf(cf::RESOURCES_BY_DISASTER)?;

        let resource_key = keys::resource_key(&resource.resource_id);
        let index_key = keys::disaster_resource_key(&resource.disaster_id, &resource.resource_id);
        let value = Self::serialize(resource)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_resources, &resource_key, &value);
        batch.put_cf(&cf_by_disaster, &index_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_resource(&self, resource_id: &ResourceId) -> Result<Option<ResourceRecord>> {
        let handle = self.cf(cf::RESOURCES)?;
        let key = keys::resource_key(resource_id);

        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_resource(&self, resource_id: &ResourceId) -> Result<()> {
        let cf_resources = self.cf(cf::RESOURCES)?;
        let cf_by_disaster = self.cf(cf::RESOURCES_BY_DISASTER)?;

        let resource = self.get_resource(resource_id)?.ok_or(StoreError::NotFound)?;

        let resource_key = keys::resource_key(resource_id);
        let index_key = keys::disaster_resource_key(&resource.disaster_id, resource_id);

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_resources, &resource_key);
        batch.delete_cf(&cf_by_disaster, &index_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_resources_by_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<ResourceRecord>> {
        let prefix = keys::disaster_prefix(disaster_id);
        let index_keys = self.scan_prefix(cf::RESOURCES_BY_DISASTER, &prefix)?;

        let mut resources = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let resource_id = keys::extract_resource_id_from_disaster_key(&key);
            if let Some(resource) = self.get_resource(&resource_id)? {
                resources.push(resource);
            }
        }

        Ok(resources)
    }
}
