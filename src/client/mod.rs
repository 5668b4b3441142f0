//! Backend communication clients.
//!
//! # Data Flow
//! ```text
//! Endpoint (from resolver)
//!     → cache.rs (reuse the live client for this endpoint, or build one)
//!         → ClientFactory::create_client (dispatcher.rs for HTTP)
//!     → CommunicationClient (bound to exactly one endpoint)
//! ```
//!
//! # Design Decisions
//! - The cache is generic over the factory, so retry logic can be exercised
//!   without sockets
//! - A client never changes the endpoint it is bound to
//! - Construction errors surface to the caller untouched

pub mod cache;
pub mod dispatcher;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::resolver::Endpoint;

pub use cache::ClientCache;
pub use dispatcher::{HttpDispatcher, HttpDispatcherFactory};

/// Reusable handle to one backend endpoint.
pub trait CommunicationClient: Send + Sync + 'static {
    /// Endpoint this client was created for.
    fn endpoint(&self) -> &Endpoint;

    /// False once the client can no longer be used.
    fn is_open(&self) -> bool {
        true
    }
}

/// Creates and releases clients for the cache.
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    type Client: CommunicationClient;

    async fn create_client(&self, endpoint: &Endpoint) -> GatewayResult<Self::Client>;

    /// Release transport resources held by an evicted client.
    fn abort_client(&self, _client: &Self::Client) {}
}
