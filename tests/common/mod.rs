//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Json;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use partition_gateway::config::{parse_config, validate_config};
use partition_gateway::{Gateway, GatewayConfig, GatewayServer, Shutdown};

/// Start a backend that echoes the request it received as JSON.
///
/// The response carries `x-backend: <name>` so tests can tell replicas apart.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = axum::Router::new().fallback(move |request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let echo: Value = json!({
            "backend": name,
            "method": parts.method.as_str(),
            "path": parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/"),
            "host": header("host"),
            "forwarded_prefix": header("x-forwarded-prefix"),
            "content_type": header("content-type"),
            "custom": header("x-custom"),
            "request_id": header("x-request-id"),
            "body": String::from_utf8_lossy(&body),
        });
        ([("x-backend", name)], Json(echo))
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a programmable mock backend with async support.
///
/// `f` decides the status and body of each response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Single-route, single-partition configuration.
///
/// `route_extra` is appended to the `[[routes]]` table; `config_extra` goes
/// before it at top level. Each backend becomes one stateless instance.
pub fn single_service_config(
    mount_path: &str,
    relative_path: &str,
    route_extra: &str,
    config_extra: &str,
    backends: &[SocketAddr],
) -> GatewayConfig {
    let replicas = backends
        .iter()
        .map(|addr| format!(r#"{{ endpoints = {{ "" = "http://{addr}/" }} }}"#))
        .collect::<Vec<_>>()
        .join(", ");

    let toml = format!(
        r#"
        {config_extra}

        [observability]
        metrics_enabled = false

        [[routes]]
        name = "test"
        mount_path = "{mount_path}"
        relative_path = "{relative_path}"
        service_uri = "fabric:/Test/Service"
        {route_extra}

        [routes.retries]
        max_retry_count = 3
        retry_delay_ms = 10
        max_retry_delay_ms = 50

        [[services]]
        service_uri = "fabric:/Test/Service"

        [[services.partitions]]
        kind = "singleton"
        replicas = [{replicas}]
        "#
    );
    parse_valid(&toml)
}

/// Parse and validate a configuration, panicking with every problem found.
pub fn parse_valid(toml: &str) -> GatewayConfig {
    let config = parse_config(toml).unwrap();
    if let Err(errors) = validate_config(&config) {
        panic!("invalid test config: {errors:?}");
    }
    config
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let gateway = Arc::new(Gateway::new(&config).unwrap());
    let server = GatewayServer::with_gateway(&config, gateway.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        gateway,
        shutdown,
    }
}

/// Test client that bypasses any system proxy and does not pool.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
