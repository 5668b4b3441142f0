//! Partition addressing.
//!
//! # Data Flow
//! ```text
//! Inbound request (path, headers)
//!     → selector.rs (derive PartitionKey, e.g. FNV-1a of a path segment)
//!     → ServiceTarget { service, key, replica selector, listener }
//!     → resolver (ServiceTarget → Endpoint)
//! ```
//!
//! # Design Decisions
//! - ServiceTarget is an immutable value built once per request
//! - Key derivation is pure; the same request always maps to the same key

pub mod hash;
pub mod selector;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use hash::{fnv1a_64, partition_hash};
pub use selector::PartitionKeySelector;

/// URI naming a logical backend service, e.g. `fabric:/App/Service`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceUri(String);

impl ServiceUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key addressing one partition of a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    /// The service has a single partition.
    Singleton,
    /// Uniform int64 partitioning.
    Int64(i64),
    /// Named partitioning.
    Named(String),
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Singleton => f.write_str("singleton"),
            PartitionKey::Int64(key) => write!(f, "int64:{key}"),
            PartitionKey::Named(name) => write!(f, "named:{name}"),
        }
    }
}

/// Which replica of a partition a request should be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetReplicaSelector {
    /// Primary for stateful services, any instance otherwise.
    #[default]
    Default,
    PrimaryReplica,
    RandomInstance,
    RandomReplica,
    RandomSecondaryReplica,
}

/// Identity of the backend a single request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub service_uri: ServiceUri,
    pub partition_key: PartitionKey,
    pub replica_selector: TargetReplicaSelector,
    pub listener_name: Option<String>,
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.service_uri, self.partition_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let target = ServiceTarget {
            service_uri: ServiceUri::new("fabric:/App/Orders"),
            partition_key: PartitionKey::Int64(-5),
            replica_selector: TargetReplicaSelector::Default,
            listener_name: None,
        };
        assert_eq!(target.to_string(), "fabric:/App/Orders#int64:-5");
    }

    #[test]
    fn test_replica_selector_names() {
        let parsed: TargetReplicaSelector =
            serde_json::from_str("\"random_secondary_replica\"").unwrap();
        assert_eq!(parsed, TargetReplicaSelector::RandomSecondaryReplica);
    }
}
