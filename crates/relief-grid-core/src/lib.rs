//! Core types and utilities for relief-grid.
//!
//! This crate provides the foundational types used throughout the relief-grid
//! platform:
//!
//! - **Identifiers**: Strongly-typed IDs for disasters, tasks, resources,
//!   messages, and actors, plus the `RoomId` namespace key
//! - **Roles**: The participant role taxonomy (citizen, volunteer,
//!   first responder, government)
//! - **Geo**: Geohash encoding and distance helpers
//!
//! # Example
//!
//! ```
//! use relief_grid_core::{geo, DisasterId, RoomId};
//!
//! // Encode a point at coarse proximity precision
//! let point = geo::GeoPoint::new(6.9271, 79.8612).unwrap();
//! let hash = geo::encode(point, geo::COARSE_PRECISION).unwrap();
//! assert_eq!(hash.len(), 4);
//!
//! // Every disaster owns a chat room; "global" is the ungrouped room
//! let room: RoomId = "global".parse().unwrap();
//! assert_eq!(room, RoomId::Global);
//! let _scoped = RoomId::Disaster(DisasterId::generate());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod geo;
pub mod ids;
pub mod roles;

pub use geo::{GeoError, GeoPoint, COARSE_PRECISION, STORAGE_PRECISION};
pub use ids::{ActorId, DisasterId, IdError, MessageId, ResourceId, RoomId, TaskId};
pub use roles::Role;
