//! Role-gated task and resource state machines for relief-grid.
//!
//! [`TaskLedger`] is the single mutation path for task records and enforces
//! the `pending -> complete | cancel` state machine with role gates.
//! [`ResourceCounter`] keeps `0 <= availability <= capacity` for disaster
//! resources, linearizing updates per resource id. Both persist through the
//! store and return canonical updated records so callers observe their own
//! writes without re-reading.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod resources;
mod tasks;
pub mod transitions;

pub use error::{LedgerError, Result};
pub use resources::ResourceCounter;
pub use tasks::TaskLedger;
