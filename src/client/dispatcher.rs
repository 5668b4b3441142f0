//! HTTP dispatcher bound to one backend endpoint.
//!
//! # Responsibilities
//! - Own the connection pool used to talk to a single endpoint
//! - Send one outbound request under the attempt timeout
//! - Stop waiting as soon as the request is cancelled
//! - Report connection failures distinctly from other transport errors
//!
//! # Design Decisions
//! - One hyper client per endpoint so eviction releases exactly that
//!   endpoint's connections
//! - A connection failure closes the dispatcher; the cache replaces it on
//!   the next acquire

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientFactory, CommunicationClient};
use crate::config::TimeoutConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::resolver::Endpoint;

/// Client for one backend endpoint.
#[derive(Debug)]
pub struct HttpDispatcher {
    endpoint: Endpoint,
    client: Client<HttpConnector, Body>,
    attempt_timeout: Duration,
    open: AtomicBool,
}

impl HttpDispatcher {
    /// Send `request` and wait for the response head.
    pub async fn send(
        &self,
        request: Request<Body>,
        cancel: &CancellationToken,
    ) -> GatewayResult<Response<Incoming>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = tokio::time::timeout(self.attempt_timeout, self.client.request(request)) => {
                match result {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(e)) if e.is_connect() => {
                        self.close();
                        Err(GatewayError::Connect {
                            endpoint: self.endpoint.to_string(),
                            source: e,
                        })
                    }
                    Ok(Err(e)) => Err(GatewayError::Transport {
                        endpoint: self.endpoint.to_string(),
                        source: e,
                    }),
                    Err(_) => Err(GatewayError::Timeout {
                        endpoint: self.endpoint.to_string(),
                        timeout: self.attempt_timeout,
                    }),
                }
            }
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl CommunicationClient for HttpDispatcher {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Builds [`HttpDispatcher`]s with the configured timeouts.
#[derive(Debug, Clone)]
pub struct HttpDispatcherFactory {
    connect_timeout: Duration,
    idle_timeout: Duration,
    attempt_timeout: Duration,
}

impl HttpDispatcherFactory {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: timeouts.connect(),
            idle_timeout: timeouts.idle(),
            attempt_timeout: timeouts.attempt(),
        }
    }
}

#[async_trait]
impl ClientFactory for HttpDispatcherFactory {
    type Client = HttpDispatcher;

    async fn create_client(&self, endpoint: &Endpoint) -> GatewayResult<HttpDispatcher> {
        if endpoint.scheme() != "http" {
            return Err(GatewayError::ClientBuild {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(self.connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(self.idle_timeout)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Ok(HttpDispatcher {
            endpoint: endpoint.clone(),
            client,
            attempt_timeout: self.attempt_timeout,
            open: AtomicBool::new(true),
        })
    }

    fn abort_client(&self, client: &HttpDispatcher) {
        client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> HttpDispatcherFactory {
        HttpDispatcherFactory::new(&TimeoutConfig {
            connect_secs: 1,
            attempt_secs: 1,
            request_secs: 5,
            idle_secs: 5,
        })
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme() {
        let endpoint = Endpoint::parse("https://10.0.0.5:8443/").unwrap();
        let err = factory().create_client(&endpoint).await.unwrap_err();
        assert!(matches!(err, GatewayError::ClientBuild { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_closes_dispatcher() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::parse(&format!("http://{addr}/")).unwrap();
        let dispatcher = factory().create_client(&endpoint).await.unwrap();
        let request = Request::builder()
            .uri(format!("http://{addr}/"))
            .body(Body::empty())
            .unwrap();

        let err = dispatcher
            .send(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_connect());
        assert!(!dispatcher.is_open());
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let endpoint = Endpoint::parse("http://10.255.255.1:81/").unwrap();
        let dispatcher = factory().create_client(&endpoint).await.unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let request = Request::builder()
            .uri("http://10.255.255.1:81/")
            .body(Body::empty())
            .unwrap();
        let err = dispatcher.send(request, &token).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
