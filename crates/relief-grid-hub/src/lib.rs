//! Room-partitioned real-time messaging for relief-grid.
//!
//! Two layers: [`RoomRegistry`] tracks which listeners are currently
//! connected to which room, and [`MessageHub`] assigns per-room sequence
//! numbers, appends each message to the durable log, and fans it out.
//! Delivery never precedes durability.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod hub;
mod registry;

pub use error::{HubError, Result};
pub use hub::{HubConfig, MessageHub};
pub use registry::{RoomRegistry, Subscription};
