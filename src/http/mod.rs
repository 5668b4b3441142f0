//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → [gateway: route, partition key, retry loop]
//!     → translate.rs (inbound → outbound request, response → inbound)
//!     → body.rs (cancellable response streaming)
//!     → response.rs (JSON error responses for terminal failures)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod response;
pub mod server;
pub mod translate;

pub use request::X_REQUEST_ID;
pub use response::ErrorResponse;
pub use server::GatewayServer;
