//! Partition key selection.
//!
//! # Responsibilities
//! - Turn inbound request metadata into a `PartitionKey`
//! - Provide the stock selectors the configuration can name
//!
//! # Design Decisions
//! - Selectors are pure functions of (path, headers)
//! - A request the selector cannot key is a validation error, not a retry

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};

use crate::config::PartitionKeyConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::partition::{partition_hash, PartitionKey};

/// The parts of an inbound request a selector may look at.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    /// Path below the gateway mount point.
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

type SelectFn = dyn Fn(&RequestMeta<'_>) -> GatewayResult<PartitionKey> + Send + Sync;

/// Function from request metadata to the partition key to address.
#[derive(Clone)]
pub struct PartitionKeySelector {
    name: &'static str,
    select: Arc<SelectFn>,
}

impl PartitionKeySelector {
    /// Wrap an arbitrary selection function.
    pub fn new<F>(name: &'static str, select: F) -> Self
    where
        F: Fn(&RequestMeta<'_>) -> GatewayResult<PartitionKey> + Send + Sync + 'static,
    {
        Self {
            name,
            select: Arc::new(select),
        }
    }

    /// Always addresses the singleton partition.
    pub fn singleton() -> Self {
        Self::new("singleton", |_| Ok(PartitionKey::Singleton))
    }

    /// Int64 key from the FNV-1a hash of the first non-empty path segment.
    ///
    /// The segment is percent-decoded before hashing.
    pub fn first_segment_hash() -> Self {
        Self::new("first_segment_hash", |meta| {
            first_segment(meta.path).map(|segment| PartitionKey::Int64(partition_hash(&segment)))
        })
    }

    /// Named key equal to the first non-empty path segment, percent-decoded.
    pub fn first_segment_name() -> Self {
        Self::new("first_segment_name", |meta| {
            first_segment(meta.path).map(|segment| PartitionKey::Named(segment.into_owned()))
        })
    }

    /// Int64 key from the FNV-1a hash of a header value.
    pub fn header_hash(header: HeaderName) -> Self {
        Self::new("header_hash", move |meta| {
            let value = meta
                .headers
                .get(&header)
                .ok_or_else(|| GatewayError::PartitionKey(format!("missing header {header}")))?;
            let value = value.to_str().map_err(|_| {
                GatewayError::PartitionKey(format!("header {header} is not visible ASCII"))
            })?;
            Ok(PartitionKey::Int64(partition_hash(value)))
        })
    }

    /// Build the selector a route's configuration names.
    pub fn from_config(config: &PartitionKeyConfig) -> GatewayResult<Self> {
        match config {
            PartitionKeyConfig::Singleton => Ok(Self::singleton()),
            PartitionKeyConfig::FirstSegmentHash => Ok(Self::first_segment_hash()),
            PartitionKeyConfig::FirstSegmentName => Ok(Self::first_segment_name()),
            PartitionKeyConfig::HeaderHash { header } => {
                let header = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
                    GatewayError::InvalidArgument(format!("invalid header name {header:?}: {e}"))
                })?;
                Ok(Self::header_hash(header))
            }
        }
    }

    pub fn select(&self, meta: &RequestMeta<'_>) -> GatewayResult<PartitionKey> {
        (self.select)(meta)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for PartitionKeySelector {
    fn default() -> Self {
        Self::singleton()
    }
}

impl fmt::Debug for PartitionKeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionKeySelector")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn first_segment(path: &str) -> GatewayResult<Cow<'_, str>> {
    let segment = path
        .split('/')
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| GatewayError::PartitionKey(format!("path {path:?} has no segment to key on")))?;
    urlencoding::decode(segment).map_err(|_| {
        GatewayError::PartitionKey(format!("segment {segment:?} does not decode to UTF-8"))
    })
}
