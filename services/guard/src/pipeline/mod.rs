//! Event routing and fraud-response reaction logic.

pub mod handlers;
pub mod metrics;
pub mod router;

pub use handlers::{ChainAddresses, GuardPipeline};
pub use metrics::GuardMetrics;
pub use router::decode_log;
