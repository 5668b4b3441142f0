//! Partition Gateway Library
//!
//! HTTP reverse proxy for partitioned, replicated backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                   PARTITION GATEWAY                  │
//!                         │                                                      │
//!     Client Request      │  ┌─────────┐    ┌─────────┐    ┌───────────────┐     │
//!     ────────────────────┼─▶│  http   │───▶│ routing │───▶│   partition   │     │
//!                         │  │ server  │    │ (mount) │    │ key selector  │     │
//!                         │  └─────────┘    └─────────┘    └───────┬───────┘     │
//!                         │                                        ▼             │
//!                         │                                ┌───────────────┐     │
//!                         │                                │  resilience   │     │
//!                         │                                │ retry invoker │     │
//!                         │                                └───┬───────┬───┘     │
//!                         │                                    ▼       ▼         │
//!                         │                           ┌──────────┐ ┌──────────┐  │
//!                         │                           │ resolver │ │  client  │  │
//!                         │                           │          │ │  cache   │  │
//!                         │                           └──────────┘ └────┬─────┘  │
//!     Client Response     │  ┌──────────┐                               ▼        │
//!     ◀───────────────────┼──│translate │◀──────────────────────── dispatcher ◀──┼── Backend
//!                         │  └──────────┘                                        │   Replica
//!                         │                                                      │
//!                         │  Cross-cutting: config, observability, lifecycle     │
//!                         └──────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod routing;

// Backend addressing
pub mod client;
pub mod partition;
pub mod resolver;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
