//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::partition::{ServiceUri, TargetReplicaSelector};
use crate::resilience::RetrySettings;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Headers the gateway adds when forwarding.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Gateway mounts, each forwarding to one backend service.
    pub routes: Vec<RouteConfig>,

    /// Static service topology used by the built-in resolver.
    pub services: Vec<ServiceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for one upstream attempt to return response headers.
    pub attempt_secs: u64,

    /// Total time allowed for an inbound request, retries included.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn attempt(&self) -> Duration {
        Duration::from_secs(self.attempt_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            attempt_secs: 30,
            request_secs: 120,
            idle_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Forwarding header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Header carrying the path base the gateway was reached under.
    pub path_base_header: String,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            path_base_header: "x-forwarded-prefix".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Retry classification policy for a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Every failure is terminal (only 503 responses are retried).
    #[default]
    AlwaysNonTransient,
    /// Timeouts and connection failures are retried as well.
    TransportAware,
}

/// How a route derives the partition key from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionKeyConfig {
    #[default]
    Singleton,
    /// FNV-1a hash of the first path segment below the mount.
    FirstSegmentHash,
    /// Named partition equal to the first path segment below the mount.
    FirstSegmentName,
    /// FNV-1a hash of a header value.
    HeaderHash { header: String },
}

/// Retry configuration for one route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry budget for transient failures.
    pub max_retry_count: u32,

    /// Base back-off delay in milliseconds.
    pub retry_delay_ms: u64,

    /// Back-off cap in milliseconds.
    pub max_retry_delay_ms: u64,

    /// Retry budget reported for non-transient failures.
    pub default_max_retry_count_for_non_transient: u32,
}

impl RetryConfig {
    pub fn to_settings(&self) -> RetrySettings {
        RetrySettings {
            max_retry_count: self.max_retry_count,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
            default_max_retry_count_for_non_transient: self
                .default_max_retry_count_for_non_transient,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 30,
            retry_delay_ms: 2000,
            max_retry_delay_ms: 2000,
            default_max_retry_count_for_non_transient: 30,
        }
    }
}

/// A gateway mount forwarding to one backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix the gateway is mounted under; becomes the path base.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Backend service to forward to.
    pub service_uri: ServiceUri,

    /// Path inserted between the endpoint prefix and the request path.
    #[serde(default)]
    pub relative_path: String,

    /// Endpoint listener to use when a replica exposes several.
    #[serde(default)]
    pub listener_name: Option<String>,

    #[serde(default)]
    pub target_replica_selector: TargetReplicaSelector,

    #[serde(default)]
    pub classifier: ClassifierKind,

    #[serde(default)]
    pub partition_key: PartitionKeyConfig,

    #[serde(default)]
    pub retries: RetryConfig,
}

fn default_mount_path() -> String {
    "/".to_string()
}

/// Replica role within a partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaRole {
    Primary,
    Secondary,
    /// Instance of a stateless service.
    #[default]
    Instance,
}

/// One replica and the addresses of its listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicaConfig {
    #[serde(default)]
    pub role: ReplicaRole,

    /// Listener name → absolute URL. The empty name is the default listener.
    pub endpoints: BTreeMap<String, String>,
}

/// Partition scheme entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionKindConfig {
    Singleton,
    /// Inclusive int64 key range.
    Int64Range { low: i64, high: i64 },
    Named { name: String },
}

/// One partition of a statically configured service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartitionConfig {
    #[serde(flatten)]
    pub kind: PartitionKindConfig,

    pub replicas: Vec<ReplicaConfig>,
}

/// A statically configured backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub service_uri: ServiceUri,

    pub partitions: Vec<PartitionConfig>,
}
