//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (route lookup in registration order)
//!     → matcher.rs (segment match, placeholder captures)
//!     → router.rs (guards, then controller action)
//!     → Return: Dispatch { outcome, response }
//!
//! Route Registration (at startup):
//!     method + path + (controller, action) + guard specs
//!     → Normalize path, compile pattern
//!     → Parse guard specs (bad spec = startup error)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{match_path, PathPattern, Segment};
pub use router::{Dispatch, Outcome, Route, RouteError, Router};
