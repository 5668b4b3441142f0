//! Gateway entry point.
//!
//! # Responsibilities
//! - Match the inbound request to a configured route
//! - Derive the service target (partition key included) for the request
//! - Buffer the request body once and forward it through the retry loop
//! - Turn terminal failures into logged, explicit error responses
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → routing (mount → path base + remainder)
//!     → PartitionKeySelector (remainder, headers → PartitionKey)
//!     → RetryingInvoker
//!         → resolver → client cache → translate + send + translate
//!     → Response (backend response or JSON error)
//! ```
//!
//! # Design Decisions
//! - One client cache shared by every route; clients are keyed by endpoint
//! - Every request runs under a child of the gateway's shutdown token and
//!   is cancelled if the caller goes away mid-flight
//! - `timeouts.request_secs` bounds body read, resolution and every retry;
//!   running out of time is a 504 like any other terminal failure

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::response::Response;
use http_body_util::LengthLimitError;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientCache, CommunicationClient, HttpDispatcherFactory};
use crate::config::{GatewayConfig, RouteConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::request_id;
use crate::http::response::ErrorResponse;
use crate::http::translate::{into_inbound_response, ForwardedRequest};
use crate::observability::metrics;
use crate::partition::selector::RequestMeta;
use crate::partition::{
    PartitionKey, PartitionKeySelector, ServiceTarget, ServiceUri, TargetReplicaSelector,
};
use crate::resilience::{classifier, RetryingInvoker};
use crate::resolver::{ServiceResolver, StaticResolver};
use crate::routing::{MountMatcher, Router};

/// Per-route forwarding options.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub service_uri: ServiceUri,
    pub relative_path: String,
    pub listener_name: Option<String>,
    pub target_replica_selector: TargetReplicaSelector,
    pub partition_key: PartitionKeySelector,
}

impl GatewayOptions {
    pub fn from_config(route: &RouteConfig) -> GatewayResult<Self> {
        Ok(Self {
            service_uri: route.service_uri.clone(),
            relative_path: route.relative_path.clone(),
            listener_name: route.listener_name.clone(),
            target_replica_selector: route.target_replica_selector,
            partition_key: PartitionKeySelector::from_config(&route.partition_key)?,
        })
    }

    pub fn target(&self, partition_key: PartitionKey) -> ServiceTarget {
        ServiceTarget {
            service_uri: self.service_uri.clone(),
            partition_key,
            replica_selector: self.target_replica_selector,
            listener_name: self.listener_name.clone(),
        }
    }
}

/// A mounted route and the invoker that serves it.
#[derive(Debug)]
pub struct GatewayRoute {
    pub name: String,
    pub options: GatewayOptions,
    invoker: RetryingInvoker<HttpDispatcherFactory>,
}

/// Reverse proxy for partitioned services.
#[derive(Debug)]
pub struct Gateway {
    router: Router<GatewayRoute>,
    cache: Arc<ClientCache<HttpDispatcherFactory>>,
    path_base_header: HeaderName,
    max_body_size: usize,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Build a gateway resolving against the configured static topology.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::new(&config.services)?);
        Self::with_resolver(config, resolver)
    }

    /// Build a gateway with a custom resolver.
    pub fn with_resolver(
        config: &GatewayConfig,
        resolver: Arc<dyn ServiceResolver>,
    ) -> GatewayResult<Self> {
        let cache = Arc::new(ClientCache::new(HttpDispatcherFactory::new(&config.timeouts)));

        let mut routes = Vec::with_capacity(config.routes.len());
        for route in &config.routes {
            let invoker = RetryingInvoker::new(
                resolver.clone(),
                cache.clone(),
                classifier::from_kind(route.classifier),
                route.retries.to_settings(),
            );
            routes.push((
                MountMatcher::new(route.mount_path.as_str()),
                GatewayRoute {
                    name: route.name.clone(),
                    options: GatewayOptions::from_config(route)?,
                    invoker,
                },
            ));
            tracing::info!(
                route = %route.name,
                mount = %route.mount_path,
                service = %route.service_uri,
                "Route registered"
            );
        }

        let path_base_header = HeaderName::from_bytes(config.forwarding.path_base_header.as_bytes())
            .map_err(|e| {
                GatewayError::InvalidArgument(format!(
                    "forwarding.path_base_header {:?}: {e}",
                    config.forwarding.path_base_header
                ))
            })?;

        Ok(Self {
            router: Router::new(routes),
            cache,
            path_base_header,
            max_body_size: config.limits.max_body_size,
            request_timeout: config.timeouts.request(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token cancelled when the gateway shuts down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn client_cache(&self) -> &Arc<ClientCache<HttpDispatcherFactory>> {
        &self.cache
    }

    /// Serve one inbound request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers());
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            "Forwarding request"
        );

        let (route_name, result) = match self.router.match_path(&path) {
            Some(matched) => {
                let path_base = matched.path_base.to_string();
                let remainder = matched.remainder.to_string();
                let forward = self.forward(matched.route, &path_base, &remainder, request);
                let result = match tokio::time::timeout(self.request_timeout, forward).await {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::Timeout {
                        endpoint: matched.route.options.service_uri.to_string(),
                        timeout: self.request_timeout,
                    }),
                };
                (matched.route.name.as_str(), result)
            }
            None => ("none", Err(GatewayError::NoRoute { path: path.clone() })),
        };

        match result {
            Ok(response) => {
                metrics::record_request(route_name, &method, response.status().as_u16(), start);
                response
            }
            Err(error) => {
                let status = error.status_code();
                tracing::error!(
                    request_id = %request_id,
                    route = route_name,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    code = error.code(),
                    error = %error,
                    "Request failed"
                );
                metrics::record_request(route_name, &method, status.as_u16(), start);
                ErrorResponse::from_error(&error)
                    .with_request_id(request_id)
                    .into_response_with_status(status)
            }
        }
    }

    async fn forward(
        &self,
        route: &GatewayRoute,
        path_base: &str,
        remainder: &str,
        request: Request<Body>,
    ) -> GatewayResult<Response> {
        let (parts, body) = request.into_parts();

        let partition_key = route.options.partition_key.select(&RequestMeta {
            path: remainder,
            headers: &parts.headers,
        })?;
        let target = route.options.target(partition_key);

        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| body_error(e, self.max_body_size))?;

        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{remainder}?{query}"),
            None => remainder.to_string(),
        };
        let forwarded =
            ForwardedRequest::new(parts.method, parts.headers, path_base, path_and_query, body);

        let cancel = self.shutdown.child_token();
        let guard = cancel.clone().drop_guard();

        let result = route
            .invoker
            .invoke(&target, &cancel, |client| {
                let outbound = forwarded.to_outbound(
                    client.endpoint(),
                    &route.options.relative_path,
                    &self.path_base_header,
                );
                let cancel = cancel.clone();
                async move {
                    let response = client.send(outbound?, &cancel).await?;
                    into_inbound_response(response, client.endpoint(), cancel)
                }
            })
            .await;

        // The response body keeps streaming under the token after we return.
        guard.disarm();
        result
    }
}

fn body_error(error: axum::Error, limit: usize) -> GatewayError {
    let source = error.into_inner();
    if source.is::<LengthLimitError>() {
        GatewayError::BodyTooLarge { limit }
    } else {
        GatewayError::RequestBody(source.to_string())
    }
}
