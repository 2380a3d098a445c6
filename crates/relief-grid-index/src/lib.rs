//! In-memory geospatial proximity index.
//!
//! The index answers "which entities are near point P, updated within the
//! last W seconds" by storing each entity's full-precision geohash and
//! comparing prefixes. Prefix match approximates a bounding-box search, so
//! the query cost is proportional to the number of indexed entities, with
//! no per-candidate distance computation; callers that need exact distances
//! compute them on the already-filtered result set.
//!
//! Reads take a shared lock and see a consistent snapshot: a query may miss
//! an upsert that is concurrently in flight, but never observes a
//! half-written entry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use relief_grid_core::geo::{self, GeoPoint, Result, STORAGE_PRECISION};

/// Freshness window applied to "nearby disasters" queries: 7 days.
pub const DEFAULT_MAX_AGE_SECS: i64 = 604_800;

/// One indexed position.
#[derive(Debug, Clone)]
struct IndexEntry {
    geohash: String,
    recorded_at: DateTime<Utc>,
}

/// A concurrent map from entity keys to their latest geohashed position.
///
/// Generic over the key so the same structure indexes disasters and contact
/// locations.
#[derive(Debug, Default)]
pub struct ProximityIndex<K> {
    entries: RwLock<HashMap<K, IndexEntry>>,
}

impl<K: Eq + Hash + Clone> ProximityIndex<K> {
    /// Create a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace an entity's position.
    ///
    /// Later queries reflect the new position; the previous entry for the
    /// same key, if any, is discarded.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::InvalidCoordinate` for a malformed point; nothing
    /// is inserted in that case.
    pub fn upsert(&self, key: K, point: GeoPoint, recorded_at: DateTime<Utc>) -> Result<()> {
        let geohash = geo::encode(point, STORAGE_PRECISION)?;
        self.entries.write().insert(
            key,
            IndexEntry {
                geohash,
                recorded_at,
            },
        );
        Ok(())
    }

    /// Remove an entity from the index.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// All entities whose hash shares the query prefix and whose position
    /// was recorded within `max_age_secs` of now.
    ///
    /// Results are unordered; callers sort by recency or distance as needed.
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::InvalidCoordinate` or `GeoError::InvalidPrecision`
    /// for a malformed query.
    pub fn query_near(
        &self,
        point: GeoPoint,
        prefix_length: usize,
        max_age_secs: i64,
    ) -> Result<Vec<K>> {
        self.query_near_at(point, prefix_length, max_age_secs, Utc::now())
    }

    /// [`Self::query_near`] against an explicit "now", for deterministic
    /// freshness checks.
    ///
    /// # Errors
    ///
    /// Same as [`Self::query_near`].
    pub fn query_near_at(
        &self,
        point: GeoPoint,
        prefix_length: usize,
        max_age_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<K>> {
        let prefix = geo::encode(point, prefix_length)?;
        let cutoff = now - Duration::seconds(max_age_secs);

        let matches: Vec<K> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.geohash.starts_with(&prefix) && entry.recorded_at >= cutoff)
            .map(|(key, _)| key.clone())
            .collect();

        Ok(matches)
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colombo() -> GeoPoint {
        GeoPoint::new(6.9271, 79.8612).unwrap()
    }

    #[test]
    fn upsert_and_query() {
        let index = ProximityIndex::new();
        index.upsert("d1", colombo(), Utc::now()).unwrap();

        let found = index
            .query_near(colombo(), geo::COARSE_PRECISION, DEFAULT_MAX_AGE_SECS)
            .unwrap();
        assert_eq!(found, vec!["d1"]);
    }

    #[test]
    fn upsert_replaces_position() {
        let index = ProximityIndex::new();
        index.upsert("d1", colombo(), Utc::now()).unwrap();

        let sydney = GeoPoint::new(-33.8688, 151.2093).unwrap();
        index.upsert("d1", sydney, Utc::now()).unwrap();

        assert!(index
            .query_near(colombo(), geo::COARSE_PRECISION, DEFAULT_MAX_AGE_SECS)
            .unwrap()
            .is_empty());
        assert_eq!(
            index
                .query_near(sydney, geo::COARSE_PRECISION, DEFAULT_MAX_AGE_SECS)
                .unwrap(),
            vec!["d1"]
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn stale_entries_are_excluded() {
        let index = ProximityIndex::new();
        let now = Utc::now();

        // Inserted 10 seconds ago: fresh.
        index
            .upsert("fresh", colombo(), now - Duration::seconds(10))
            .unwrap();
        // Inserted 8 days ago at the same coordinates: outside the window.
        index
            .upsert("stale", colombo(), now - Duration::days(8))
            .unwrap();

        let found = index
            .query_near_at(colombo(), geo::COARSE_PRECISION, DEFAULT_MAX_AGE_SECS, now)
            .unwrap();
        assert_eq!(found, vec!["fresh"]);
    }

    #[test]
    fn prefix_mismatch_is_excluded() {
        let index = ProximityIndex::new();
        let sydney = GeoPoint::new(-33.8688, 151.2093).unwrap();
        index.upsert("far", sydney, Utc::now()).unwrap();

        assert!(index
            .query_near(colombo(), geo::COARSE_PRECISION, DEFAULT_MAX_AGE_SECS)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn malformed_point_is_never_inserted() {
        let index: ProximityIndex<&str> = ProximityIndex::new();
        let bad = GeoPoint {
            latitude: 95.0,
            longitude: 0.0,
        };
        assert!(index.upsert("bad", bad, Utc::now()).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let index = ProximityIndex::new();
        index.upsert("d1", colombo(), Utc::now()).unwrap();
        assert!(index.remove(&"d1"));
        assert!(!index.remove(&"d1"));
        assert!(index.is_empty());
    }
}
