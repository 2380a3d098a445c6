//! Geohash encoding and geographic helpers.
//!
//! A geohash is a base-32 string encoding of a (latitude, longitude) pair
//! where spatial proximity correlates with shared string prefixes. The
//! proximity index filters candidates by prefix match, which approximates a
//! bounding-box search without computing exact distances; callers compute
//! haversine distance only on the already-filtered set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geohash alphabet (base 32, omitting a, i, l, o).
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Prefix length used for coarse "what is near me" queries.
pub const COARSE_PRECISION: usize = 4;

/// Precision used when persisting an entity's exact position.
pub const STORAGE_PRECISION: usize = 9;

/// Longest supported geohash.
pub const MAX_PRECISION: usize = 12;

/// Mean earth radius in meters, used by the haversine formula.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A result type using `GeoError`.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors produced by geographic encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude outside the valid range.
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate {
        /// The offending latitude.
        latitude: f64,
        /// The offending longitude.
        longitude: f64,
    },

    /// Requested precision outside `1..=MAX_PRECISION`.
    #[error("invalid geohash precision: {0}")]
    InvalidPrecision(usize),
}

/// A validated geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, in `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, in `[-180, 180]`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting out-of-range or non-finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::InvalidCoordinate` if the pair is malformed.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Re-check the coordinate ranges.
    ///
    /// Points can arrive through deserialization without passing through
    /// [`GeoPoint::new`], so consumers validate again at the boundary.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::InvalidCoordinate` if the pair is malformed.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite()
            || !self.longitude.is_finite()
            || !(-90.0..=90.0).contains(&self.latitude)
            || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(GeoError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }
}

/// Encode a point as a geohash of the given precision.
///
/// Encoding is deterministic: the same point and precision always produce
/// the same hash, and a longer hash of the same point starts with every
/// shorter hash of it.
///
/// # Errors
///
/// Returns `GeoError::InvalidPrecision` if `precision` is zero or exceeds
/// [`MAX_PRECISION`].
pub fn encode(point: GeoPoint, precision: usize) -> Result<String> {
    point.validate()?;
    if precision == 0 || precision > MAX_PRECISION {
        return Err(GeoError::InvalidPrecision(precision));
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lon_lo, mut lon_hi) = (-180.0_f64, 180.0_f64);

    let mut hash = String::with_capacity(precision);
    let mut bits = 0_u8;
    let mut chunk = 0_usize;
    let mut even_bit = true; // longitude first, per the geohash convention

    while hash.len() < precision {
        if even_bit {
            let mid = (lon_lo + lon_hi) / 2.0;
            if point.longitude >= mid {
                chunk = (chunk << 1) | 1;
                lon_lo = mid;
            } else {
                chunk <<= 1;
                lon_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if point.latitude >= mid {
                chunk = (chunk << 1) | 1;
                lat_lo = mid;
            } else {
                chunk <<= 1;
                lat_hi = mid;
            }
        }
        even_bit = !even_bit;

        bits += 1;
        if bits == 5 {
            hash.push(BASE32[chunk] as char);
            bits = 0;
            chunk = 0;
        }
    }

    Ok(hash)
}

/// Great-circle distance between two points in meters (haversine).
#[must_use]
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
