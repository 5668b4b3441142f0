//! Endpoint resolution subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceTarget (service, partition key, replica selector, listener)
//!     → ServiceResolver::resolve
//!         - static_table.rs (configured topology: partition lookup)
//!         - selection.rs (pick a replica per TargetReplicaSelector)
//!     → Endpoint (absolute listener address)
//! ```
//!
//! # Design Decisions
//! - The resolver contract is a trait; discovery backends plug in behind it
//! - The previously used endpoint is passed back on retry as a hint
//! - Resolution errors are ordinary failures for the retry classifier

pub mod endpoint;
pub mod selection;
pub mod static_table;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::partition::ServiceTarget;

pub use endpoint::Endpoint;
pub use static_table::StaticResolver;

/// Maps a service target to a concrete endpoint.
#[async_trait]
pub trait ServiceResolver: Send + Sync + std::fmt::Debug {
    /// Resolve `target`. `previous` is the endpoint the last failed attempt
    /// used, if any; implementations should prefer a different one.
    async fn resolve(
        &self,
        target: &ServiceTarget,
        previous: Option<&Endpoint>,
    ) -> GatewayResult<Endpoint>;
}
