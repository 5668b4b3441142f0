//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → retries.rs (resolve → acquire client → invoke)
//!     → On failure: classifier.rs (transient? how much budget?)
//!     → backoff.rs (exponential delay with jitter before re-resolving)
//!     → Terminal failure propagated to the gateway boundary
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Classification is a pluggable policy, not hard-coded in the loop
//! - 503 from a backend is always retried within the transient budget
//! - Cancellation ends the loop at once, without back-off

pub mod backoff;
pub mod classifier;
pub mod retries;

use std::time::Duration;

pub use classifier::{AlwaysNonTransient, FailureClassifier, RetryDecision, TransportAware};
pub use retries::RetryingInvoker;

/// Retry tuning for one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Budget for transient failures.
    pub max_retry_count: u32,
    /// Base back-off delay.
    pub retry_delay: Duration,
    /// Back-off cap.
    pub max_retry_delay: Duration,
    /// Budget reported for non-transient failures.
    pub default_max_retry_count_for_non_transient: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retry_count: 30,
            retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(2),
            default_max_retry_count_for_non_transient: 30,
        }
    }
}
