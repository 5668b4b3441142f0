//! Resolver backed by the configured service topology.
//!
//! # Responsibilities
//! - Hold the partitions and replicas of every configured service
//! - Find the partition owning a partition key
//! - Delegate replica choice to the picker of that partition

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::config::{PartitionKindConfig, ServiceConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::partition::{PartitionKey, ServiceTarget, ServiceUri};
use crate::resolver::selection::{Replica, ReplicaPicker};
use crate::resolver::{Endpoint, ServiceResolver};

#[derive(Debug)]
struct StaticPartition {
    kind: PartitionKindConfig,
    replicas: Vec<Replica>,
    picker: ReplicaPicker,
}

impl StaticPartition {
    fn owns(&self, key: &PartitionKey) -> bool {
        match (&self.kind, key) {
            (PartitionKindConfig::Singleton, PartitionKey::Singleton) => true,
            (PartitionKindConfig::Int64Range { low, high }, PartitionKey::Int64(key)) => {
                low <= key && key <= high
            }
            (PartitionKindConfig::Named { name }, PartitionKey::Named(key)) => name == key,
            _ => false,
        }
    }
}

/// Resolves targets against a fixed table of services.
#[derive(Debug, Default)]
pub struct StaticResolver {
    /// Map of service URI -> partitions.
    services: HashMap<ServiceUri, Vec<StaticPartition>>,
}

impl StaticResolver {
    /// Build the table from configuration.
    pub fn new(configs: &[ServiceConfig]) -> GatewayResult<Self> {
        let mut services = HashMap::new();

        for service in configs {
            let mut partitions = Vec::with_capacity(service.partitions.len());
            for partition in &service.partitions {
                let mut replicas = Vec::with_capacity(partition.replicas.len());
                for replica in &partition.replicas {
                    let endpoints = replica
                        .endpoints
                        .iter()
                        .map(|(name, address)| Ok((name.clone(), Endpoint::parse(address)?)))
                        .collect::<GatewayResult<BTreeMap<_, _>>>()?;
                    replicas.push(Replica {
                        role: replica.role,
                        endpoints,
                    });
                }
                partitions.push(StaticPartition {
                    kind: partition.kind.clone(),
                    replicas,
                    picker: ReplicaPicker::new(),
                });
            }
            tracing::debug!(
                service = %service.service_uri,
                partitions = partitions.len(),
                "Registered static service"
            );
            services.insert(service.service_uri.clone(), partitions);
        }

        Ok(Self { services })
    }
}

#[async_trait]
impl ServiceResolver for StaticResolver {
    async fn resolve(
        &self,
        target: &ServiceTarget,
        previous: Option<&Endpoint>,
    ) -> GatewayResult<Endpoint> {
        let partitions = self
            .services
            .get(&target.service_uri)
            .ok_or_else(|| GatewayError::resolution(target.service_uri.as_str(), "service not found"))?;

        let partition = partitions
            .iter()
            .find(|p| p.owns(&target.partition_key))
            .ok_or_else(|| {
                GatewayError::resolution(
                    target.service_uri.as_str(),
                    format!("no partition owns key {}", target.partition_key),
                )
            })?;

        partition
            .picker
            .pick(
                &partition.replicas,
                target.replica_selector,
                target.listener_name.as_deref(),
                previous,
            )
            .cloned()
            .ok_or_else(|| {
                GatewayError::resolution(
                    target.service_uri.as_str(),
                    format!(
                        "no replica of partition {} matches {:?} with listener {:?}",
                        target.partition_key,
                        target.replica_selector,
                        target.listener_name.as_deref().unwrap_or("")
                    ),
                )
            })
    }
}
