//! Request coordination.
//!
//! Concurrent callers asking for the same latest price share one in-flight
//! discovery and fetch, and every completed result is published on a
//! broadcast channel. The latest result per request key is kept for lookup.

mod price_coordinator;
mod request;

pub use price_coordinator::{PriceCoordinator, LAST_RESULTS_CAPACITY, RESULT_CHANNEL_CAPACITY};
pub use request::{LatestPriceResult, RequestKey};
