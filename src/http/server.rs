//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway as catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown is signalled
//! - Cancel in-flight forwarding when shutting down
//! - Release idle backend clients in the background

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::gateway::Gateway;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server fronting the gateway.
pub struct GatewayServer {
    router: Router,
    gateway: Arc<Gateway>,
    idle_timeout: Duration,
}

impl GatewayServer {
    /// Create a server with a gateway built from `config`.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let gateway = Arc::new(Gateway::new(config)?);
        Ok(Self::with_gateway(config, gateway))
    }

    /// Create a server around an existing gateway.
    pub fn with_gateway(config: &GatewayConfig, gateway: Arc<Gateway>) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
        };
        Self {
            router: Self::build_router(state),
            gateway,
            idle_timeout: config.timeouts.idle(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        // Outermost first: the request ID exists before tracing starts.
        let middleware = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer());

        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(middleware)
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let token = self.gateway.shutdown_token().clone();
        tokio::spawn(sweep_idle_clients(
            self.gateway.clone(),
            self.idle_timeout,
            token.clone(),
        ));

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, cancelling in-flight requests");
                token.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically release clients for endpoints nobody has used recently.
async fn sweep_idle_clients(gateway: Arc<Gateway>, idle: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(idle);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let evicted = gateway.client_cache().evict_idle(idle);
                if evicted > 0 {
                    tracing::debug!(evicted, "Released idle backend clients");
                }
            }
        }
    }
}

/// Catch-all handler: every request goes through the gateway.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.gateway.handle(request).await
}
