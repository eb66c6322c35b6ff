//! Utility functions shared by the poller and the workers.
//!
//! - **Tracking parameters**: canonicalize entry links by removing `utm_*`
//!   query parameters before deduplication
//! - **Bounded reads**: read HTTP bodies with a hard size limit

mod body;
mod tracking;

pub use body::{read_limited_bytes, BodyError};
pub use tracking::strip_tracking_params;
