//! Replica selection within a resolved partition.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::config::ReplicaRole;
use crate::partition::TargetReplicaSelector;
use crate::resolver::Endpoint;

/// One replica of a partition with its listener addresses.
#[derive(Debug, Clone)]
pub struct Replica {
    pub role: ReplicaRole,
    pub endpoints: BTreeMap<String, Endpoint>,
}

impl Replica {
    /// Address of the named listener, or the default listener when no name
    /// is given. The default listener is the one registered under `""`,
    /// else the first by name.
    pub fn listener(&self, name: Option<&str>) -> Option<&Endpoint> {
        match name {
            Some(name) => self.endpoints.get(name),
            None => self
                .endpoints
                .get("")
                .or_else(|| self.endpoints.values().next()),
        }
    }
}

/// Picks an endpoint among replicas.
/// Stores an internal counter to rotate through non-random candidates.
#[derive(Debug, Default)]
pub struct ReplicaPicker {
    counter: AtomicUsize,
}

impl ReplicaPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose an endpoint for `selector`, avoiding `previous` when another
    /// candidate exists.
    pub fn pick<'a>(
        &self,
        replicas: &'a [Replica],
        selector: TargetReplicaSelector,
        listener: Option<&str>,
        previous: Option<&Endpoint>,
    ) -> Option<&'a Endpoint> {
        let has_primary = replicas.iter().any(|r| r.role == ReplicaRole::Primary);

        let mut candidates: Vec<&Endpoint> = replicas
            .iter()
            .filter(|replica| match selector {
                TargetReplicaSelector::Default if has_primary => {
                    replica.role == ReplicaRole::Primary
                }
                TargetReplicaSelector::Default => true,
                TargetReplicaSelector::PrimaryReplica => replica.role == ReplicaRole::Primary,
                TargetReplicaSelector::RandomInstance => replica.role == ReplicaRole::Instance,
                TargetReplicaSelector::RandomReplica => true,
                TargetReplicaSelector::RandomSecondaryReplica => {
                    replica.role == ReplicaRole::Secondary
                }
            })
            .filter_map(|replica| replica.listener(listener))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        if let Some(previous) = previous {
            if candidates.iter().any(|endpoint| *endpoint != previous) {
                candidates.retain(|endpoint| *endpoint != previous);
            }
        }

        let index = match selector {
            TargetReplicaSelector::Default | TargetReplicaSelector::PrimaryReplica => {
                self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len()
            }
            _ => rand::thread_rng().gen_range(0..candidates.len()),
        };
        Some(candidates[index])
    }
}
