//! Per-endpoint client cache.
//!
//! # Responsibilities
//! - Hand out the live client for an endpoint, building it on first use
//! - Build at most one client per endpoint under concurrent callers
//! - Evict clients that are closed or bound to another endpoint
//! - Drop and abort clients on explicit invalidation
//! - Release clients for endpoints that have not been used for a while
//!
//! # Design Decisions
//! - One `OnceCell` per endpoint identity; callers racing on the same
//!   endpoint await the same construction
//! - Map guards are never held across an await
//! - Eviction compares cell pointers so a replacement built concurrently is
//!   never removed by a stale caller

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::client::{ClientFactory, CommunicationClient};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::resolver::Endpoint;

struct Slot<C> {
    cell: OnceCell<Arc<C>>,
    /// Milliseconds since the cache epoch at the last acquire.
    last_used: AtomicU64,
}

/// Keyed store of reusable backend clients.
pub struct ClientCache<F: ClientFactory> {
    factory: F,
    /// Map of endpoint identity -> client slot.
    slots: DashMap<String, Arc<Slot<F::Client>>>,
    constructed: AtomicU64,
    epoch: Instant,
}

impl<F: ClientFactory> ClientCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            slots: DashMap::new(),
            constructed: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Return a valid client for `endpoint`, building one if needed.
    pub async fn acquire(&self, endpoint: &Endpoint) -> GatewayResult<Arc<F::Client>> {
        let client = self.get_or_build(endpoint).await?;
        if is_valid(client.as_ref(), endpoint) {
            return Ok(client);
        }

        tracing::debug!(
            endpoint = %endpoint,
            bound_to = %client.endpoint(),
            open = client.is_open(),
            "Evicting invalid client"
        );
        self.evict(endpoint, &client);

        let client = self.get_or_build(endpoint).await?;
        if is_valid(client.as_ref(), endpoint) {
            Ok(client)
        } else {
            self.evict(endpoint, &client);
            Err(GatewayError::ClientBuild {
                endpoint: endpoint.to_string(),
                reason: "factory produced a client that failed validation".into(),
            })
        }
    }

    /// Remove and abort the client cached for `endpoint`, if any.
    pub fn invalidate(&self, endpoint: &Endpoint) {
        if let Some((_, slot)) = self.slots.remove(endpoint.identity()) {
            if let Some(client) = slot.cell.get() {
                self.factory.abort_client(client);
                metrics::record_client_eviction();
                tracing::debug!(endpoint = %endpoint, "Invalidated client");
            }
        }
    }

    /// Remove and abort every client not acquired within `max_idle`.
    ///
    /// Slots still under construction are kept. Returns the number evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_millis();
        let max_idle = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);

        let mut evicted = Vec::new();
        self.slots.retain(|_, slot| {
            let idle = now.saturating_sub(slot.last_used.load(Ordering::Relaxed)) >= max_idle;
            if idle && slot.cell.initialized() {
                evicted.push(slot.clone());
                false
            } else {
                true
            }
        });

        for slot in &evicted {
            if let Some(client) = slot.cell.get() {
                tracing::debug!(endpoint = %client.endpoint(), "Evicting idle client");
                self.factory.abort_client(client);
                metrics::record_client_eviction();
            }
        }
        evicted.len()
    }

    /// Number of clients built over the cache's lifetime.
    pub fn constructed(&self) -> u64 {
        self.constructed.load(Ordering::Relaxed)
    }

    /// Number of live clients.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn get_or_build(&self, endpoint: &Endpoint) -> GatewayResult<Arc<F::Client>> {
        let key = endpoint.identity();
        let now = self.now_millis();
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Slot {
                    cell: OnceCell::new(),
                    last_used: AtomicU64::new(now),
                })
            })
            .clone();
        slot.last_used.store(now, Ordering::Relaxed);

        let result = slot
            .cell
            .get_or_try_init(|| async {
                let client = self.factory.create_client(endpoint).await?;
                self.constructed.fetch_add(1, Ordering::Relaxed);
                metrics::record_client_build();
                tracing::debug!(endpoint = %endpoint, "Created client");
                Ok::<_, GatewayError>(Arc::new(client))
            })
            .await;

        match result {
            Ok(client) => Ok(client.clone()),
            Err(e) => {
                self.slots.remove_if(key, |_, current| {
                    Arc::ptr_eq(current, &slot) && !current.cell.initialized()
                });
                Err(e)
            }
        }
    }

    fn evict(&self, endpoint: &Endpoint, client: &Arc<F::Client>) {
        let removed = self.slots.remove_if(endpoint.identity(), |_, slot| {
            slot.cell.get().is_some_and(|cached| Arc::ptr_eq(cached, client))
        });
        if removed.is_some() {
            self.factory.abort_client(client);
            metrics::record_client_eviction();
        }
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

fn is_valid<C: CommunicationClient>(client: &C, endpoint: &Endpoint) -> bool {
    client.is_open() && client.endpoint() == endpoint
}

impl<F: ClientFactory> std::fmt::Debug for ClientCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("clients", &self.slots.len())
            .field("constructed", &self.constructed())
            .finish()
    }
}
