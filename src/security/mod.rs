//! Security subsystem.
//!
//! # Components
//! - guards.rs: route guards (authenticated, permitted, guest-only, ...)
//! - validator.rs: fluent validation of form and query input
//!
//! # Design Decisions
//! - Guards run in the order listed on the route; first rejection wins
//! - Failed guards redirect rather than render an error page

pub mod guards;
pub mod validator;

pub use guards::{Guard, GuardSpecError, Rejection};
pub use validator::{rules, Validator};
