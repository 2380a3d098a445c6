//! The resource counter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use relief_grid_core::{DisasterId, ResourceId, Role};
use relief_grid_store::{ResourceRecord, Store};

use crate::error::{LedgerError, Result};

/// Bounded availability tracking for disaster resources.
///
/// All mutations are government-only. Updates to one resource id are
/// linearized through a per-id lock so concurrent writers cannot interleave
/// a read-modify-write; distinct ids proceed in parallel.
pub struct ResourceCounter<S: Store> {
    store: Arc<S>,
    locks: Mutex<HashMap<ResourceId, Arc<Mutex<()>>>>,
}

impl<S: Store> ResourceCounter<S> {
    /// Create a counter over the given store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a resource attached to a disaster.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-government requesters, `OutOfRange` if the
    /// initial availability exceeds the capacity, or a store failure.
    pub fn create(
        &self,
        role: Role,
        disaster_id: DisasterId,
        name: &str,
        capacity: u32,
        availability: u32,
    ) -> Result<ResourceRecord> {
        require_government(role, "create a resource")?;
        if availability > capacity {
            return Err(LedgerError::OutOfRange {
                requested: i64::from(availability),
                capacity,
            });
        }

        let now = Utc::now();
        let resource = ResourceRecord {
            resource_id: ResourceId::generate(),
            disaster_id,
            name: name.to_string(),
            capacity,
            availability,
            created_at: now,
            updated_at: now,
        };
        self.store.put_resource(&resource)?;

        tracing::info!(
            resource_id = %resource.resource_id,
            disaster_id = %disaster_id,
            capacity,
            "Resource created"
        );

        Ok(resource)
    }

    /// Replace a resource's availability.
    ///
    /// The requested value is taken as a signed integer so that a negative
    /// submission is rejected as `OutOfRange` rather than silently wrapped.
    /// Returns the canonical updated record.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-government requesters, `OutOfRange` if the
    /// value falls outside `0..=capacity` (state unchanged),
    /// `ResourceNotFound`, or a store failure.
    pub fn set_availability(
        &self,
        resource_id: &ResourceId,
        requested: i64,
        role: Role,
    ) -> Result<ResourceRecord> {
        require_government(role, "set resource availability")?;

        let lock = self.lock_for(resource_id);
        let _guard = lock.lock();

        let mut resource = self
            .store
            .get_resource(resource_id)?
            .ok_or(LedgerError::ResourceNotFound(*resource_id))?;

        if requested < 0 || requested > i64::from(resource.capacity) {
            return Err(LedgerError::OutOfRange {
                requested,
                capacity: resource.capacity,
            });
        }

        // In range and capacity fits u32, so the cast is exact.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            resource.availability = requested as u32;
        }
        resource.updated_at = Utc::now();
        self.store.put_resource(&resource)?;

        tracing::info!(
            resource_id = %resource_id,
            availability = resource.availability,
            capacity = resource.capacity,
            "Resource availability updated"
        );

        Ok(resource)
    }

    /// Remove a resource. Subsequent reads fail with `ResourceNotFound`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-government requesters, `ResourceNotFound`, or
    /// a store failure.
    pub fn delete(&self, resource_id: &ResourceId, role: Role) -> Result<()> {
        require_government(role, "delete a resource")?;

        let lock = self.lock_for(resource_id);
        let _guard = lock.lock();

        self.store.delete_resource(resource_id).map_err(|e| {
            if matches!(e, relief_grid_store::StoreError::NotFound) {
                LedgerError::ResourceNotFound(*resource_id)
            } else {
                LedgerError::Store(e)
            }
        })?;
        self.locks.lock().remove(resource_id);

        tracing::info!(resource_id = %resource_id, "Resource deleted");
        Ok(())
    }

    /// Get a resource by id.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` or a store failure.
    pub fn get(&self, resource_id: &ResourceId) -> Result<ResourceRecord> {
        self.store
            .get_resource(resource_id)?
            .ok_or(LedgerError::ResourceNotFound(*resource_id))
    }

    /// List all resources attached to a disaster.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_for_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<ResourceRecord>> {
        Ok(self.store.list_resources_by_disaster(disaster_id)?)
    }

    fn lock_for(&self, resource_id: &ResourceId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(*resource_id).or_default())
    }
}

fn require_government(role: Role, action: &'static str) -> Result<()> {
    if role == Role::Government {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized { role, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_grid_store::RocksStore;
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (Arc<ResourceCounter<RocksStore>>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (Arc::new(ResourceCounter::new(store)), dir)
    }

    #[test]
    fn create_is_government_only() {
        let (counter, _dir) = setup();
        let disaster = DisasterId::generate();

        for role in [Role::User, Role::Volunteer, Role::FirstResponder] {
            let result = counter.create(role, disaster, "shelter beds", 10, 10);
            assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        }

        let resource = counter
            .create(Role::Government, disaster, "shelter beds", 10, 10)
            .unwrap();
        assert_eq!(resource.capacity, 10);
        assert_eq!(resource.availability, 10);
    }

    #[test]
    fn set_availability_enforces_bounds() {
        let (counter, _dir) = setup();
        let resource = counter
            .create(Role::Government, DisasterId::generate(), "water tanks", 10, 7)
            .unwrap();
        let id = resource.resource_id;

        // Over capacity.
        let result = counter.set_availability(&id, 15, Role::Government);
        assert!(matches!(
            result,
            Err(LedgerError::OutOfRange {
                requested: 15,
                capacity: 10
            })
        ));
        assert_eq!(counter.get(&id).unwrap().availability, 7);

        // Negative.
        let result = counter.set_availability(&id, -1, Role::Government);
        assert!(matches!(result, Err(LedgerError::OutOfRange { .. })));
        assert_eq!(counter.get(&id).unwrap().availability, 7);

        // Boundary values are valid.
        assert_eq!(counter.set_availability(&id, 0, Role::Government).unwrap().availability, 0);
        assert_eq!(counter.set_availability(&id, 10, Role::Government).unwrap().availability, 10);
    }

    #[test]
    fn set_availability_rejects_non_government() {
        let (counter, _dir) = setup();
        let resource = counter
            .create(Role::Government, DisasterId::generate(), "medkits", 5, 5)
            .unwrap();

        let result = counter.set_availability(&resource.resource_id, 3, Role::Volunteer);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(counter.get(&resource.resource_id).unwrap().availability, 5);
    }

    #[test]
    fn delete_then_read_is_not_found() {
        let (counter, _dir) = setup();
        let resource = counter
            .create(Role::Government, DisasterId::generate(), "boats", 3, 3)
            .unwrap();
        let id = resource.resource_id;

        assert!(matches!(
            counter.delete(&id, Role::User),
            Err(LedgerError::Unauthorized { .. })
        ));

        counter.delete(&id, Role::Government).unwrap();
        assert!(matches!(counter.get(&id), Err(LedgerError::ResourceNotFound(_))));
        assert!(matches!(
            counter.set_availability(&id, 1, Role::Government),
            Err(LedgerError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn concurrent_updates_to_one_resource_never_break_the_invariant() {
        let (counter, _dir) = setup();
        let resource = counter
            .create(Role::Government, DisasterId::generate(), "cots", 20, 20)
            .unwrap();
        let id = resource.resource_id;

        let handles: Vec<_> = (0..8_i64)
            .map(|i| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for value in [i, 20, 0, 25, -3, i * 2] {
                        let _ = counter.set_availability(&id, value, Role::Government);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let final_state = counter.get(&id).unwrap();
        assert!(final_state.availability <= final_state.capacity);
    }
}
