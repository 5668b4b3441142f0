//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup, longest mount first)
//!     → matcher.rs (segment-boundary prefix match)
//!     → Return: matched route + path base + remainder, or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile mount matchers
//!     → Sort by mount length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::MountMatcher;
pub use router::{RouteMatch, Router};
