//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference configured services)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting mounts and overlapping partitions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{
    GatewayConfig, PartitionConfig, PartitionKeyConfig, PartitionKindConfig, RouteConfig,
    ServiceConfig,
};
use crate::resolver::Endpoint;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.attempt_secs", timeouts.attempt_secs),
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.idle_secs", timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new(
            "limits.max_body_size",
            "must be greater than zero",
        ));
    }

    if HeaderName::from_bytes(config.forwarding.path_base_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "forwarding.path_base_header",
            format!("{:?} is not a valid header name", config.forwarding.path_base_header),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::new("routes", "at least one route is required"));
    }

    let known_services: HashSet<&str> = config
        .services
        .iter()
        .map(|service| service.service_uri.as_str())
        .collect();

    let mut route_names = HashSet::new();
    let mut mounts = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{index}]");
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("duplicate route name {:?}", route.name),
            ));
        }
        if !mounts.insert(route.mount_path.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("{field}.mount_path"),
                format!("mount path {:?} is used by another route", route.mount_path),
            ));
        }
        validate_route(&field, route, &known_services, &mut errors);
    }

    let mut service_uris = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        let field = format!("services[{index}]");
        if !service_uris.insert(service.service_uri.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.service_uri"),
                format!("duplicate service {}", service.service_uri),
            ));
        }
        validate_service(&field, service, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(
    field: &str,
    route: &RouteConfig,
    known_services: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    if !route.mount_path.starts_with('/') {
        errors.push(ValidationError::new(
            format!("{field}.mount_path"),
            "must start with '/'",
        ));
    }

    if !route.relative_path.is_empty() && !route.relative_path.starts_with('/') {
        errors.push(ValidationError::new(
            format!("{field}.relative_path"),
            "must be empty or start with '/'",
        ));
    }
    if route.relative_path.contains(['?', '#']) {
        errors.push(ValidationError::new(
            format!("{field}.relative_path"),
            "must not contain a query or fragment",
        ));
    }

    if url::Url::parse(route.service_uri.as_str()).is_err() {
        errors.push(ValidationError::new(
            format!("{field}.service_uri"),
            format!("{} is not an absolute URI", route.service_uri),
        ));
    } else if !known_services.contains(route.service_uri.as_str()) {
        errors.push(ValidationError::new(
            format!("{field}.service_uri"),
            format!("service {} is not defined under [[services]]", route.service_uri),
        ));
    }

    if let PartitionKeyConfig::HeaderHash { header } = &route.partition_key {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("{field}.partition_key.header"),
                format!("{header:?} is not a valid header name"),
            ));
        }
    }

    if route.retries.max_retry_delay_ms < route.retries.retry_delay_ms {
        errors.push(ValidationError::new(
            format!("{field}.retries.max_retry_delay_ms"),
            "must not be smaller than retry_delay_ms",
        ));
    }
}

fn validate_service(field: &str, service: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    if service.partitions.is_empty() {
        errors.push(ValidationError::new(
            format!("{field}.partitions"),
            "at least one partition is required",
        ));
        return;
    }

    let singleton_count = service
        .partitions
        .iter()
        .filter(|p| p.kind == PartitionKindConfig::Singleton)
        .count();
    if singleton_count > 0 && service.partitions.len() > 1 {
        errors.push(ValidationError::new(
            format!("{field}.partitions"),
            "a singleton partition cannot be combined with other partitions",
        ));
    }

    let mut ranges: Vec<(i64, i64)> = Vec::new();
    let mut names = HashSet::new();
    for (index, partition) in service.partitions.iter().enumerate() {
        let field = format!("{field}.partitions[{index}]");
        match &partition.kind {
            PartitionKindConfig::Singleton => {}
            PartitionKindConfig::Int64Range { low, high } => {
                if low > high {
                    errors.push(ValidationError::new(
                        field.clone(),
                        format!("range low {low} is greater than high {high}"),
                    ));
                } else if ranges.iter().any(|(l, h)| low <= h && l <= high) {
                    errors.push(ValidationError::new(
                        field.clone(),
                        format!("range [{low}, {high}] overlaps another partition"),
                    ));
                } else {
                    ranges.push((*low, *high));
                }
            }
            PartitionKindConfig::Named { name } => {
                if !names.insert(name.as_str()) {
                    errors.push(ValidationError::new(
                        field.clone(),
                        format!("duplicate partition name {name:?}"),
                    ));
                }
            }
        }
        validate_partition(&field, partition, errors);
    }
}

fn validate_partition(field: &str, partition: &PartitionConfig, errors: &mut Vec<ValidationError>) {
    if partition.replicas.is_empty() {
        errors.push(ValidationError::new(
            format!("{field}.replicas"),
            "at least one replica is required",
        ));
    }

    for (index, replica) in partition.replicas.iter().enumerate() {
        if replica.endpoints.is_empty() {
            errors.push(ValidationError::new(
                format!("{field}.replicas[{index}].endpoints"),
                "at least one listener endpoint is required",
            ));
        }
        for (listener, address) in &replica.endpoints {
            if let Err(e) = Endpoint::parse(address) {
                errors.push(ValidationError::new(
                    format!("{field}.replicas[{index}].endpoints.{listener:?}"),
                    e.to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    const VALID: &str = r#"
        [[routes]]
        name = "values"
        mount_path = "/api/v1/values"
        relative_path = "/api/v1/values"
        service_uri = "fabric:/HttpGatewayApplication/HttpGatewayWebApi"
        partition_key = { kind = "first_segment_hash" }

        [[services]]
        service_uri = "fabric:/HttpGatewayApplication/HttpGatewayWebApi"

        [[services.partitions]]
        kind = "int64_range"
        low = -1000
        high = -1
        replicas = [{ role = "primary", endpoints = { "" = "http://10.0.0.5:8080/" } }]

        [[services.partitions]]
        kind = "int64_range"
        low = 0
        high = 1000
        replicas = [{ role = "primary", endpoints = { "" = "http://10.0.0.6:8080/" } }]
    "#;

    #[test]
    fn test_valid_config() {
        let config = parse_config(VALID).unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config_rejected() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = parse_config(VALID).unwrap();
        config.routes[0].relative_path = "api".into();
        config.routes[0].retries.max_retry_delay_ms = 10;
        config.timeouts.connect_secs = 0;
        config.services[0].partitions[1].kind = PartitionKindConfig::Int64Range { low: -5, high: 5 };

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"routes[0].relative_path"));
        assert!(fields.contains(&"routes[0].retries.max_retry_delay_ms"));
        assert!(fields.contains(&"timeouts.connect_secs"));
        assert!(fields.contains(&"services[0].partitions[1]"));
    }

    #[test]
    fn test_unknown_service_rejected() {
        let mut config = parse_config(VALID).unwrap();
        config.routes[0].service_uri = crate::partition::ServiceUri::new("fabric:/Other/Svc");
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "routes[0].service_uri" && e.message.contains("not defined")));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut config = parse_config(VALID).unwrap();
        config.services[0].partitions[0].replicas[0]
            .endpoints
            .insert(String::new(), "not a url".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field.starts_with("services[0].partitions[0].replicas[0].endpoints")));
    }
}
