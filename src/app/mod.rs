//! Demo application built on the framework.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     accounts.rs (create tables, seed the first administrator)
//!     → routes.rs (controller registry + route table)
//!
//! Request:
//!     Router::dispatch → home.rs / auth.rs / users.rs
//!     → Model (users, permissions tables)
//!     → Response (page or redirect with notifications)
//! ```
//!
//! # Responsibilities
//! - Sign in and out, with a forced password change for seeded accounts
//! - List, show and create users behind permission and admin guards

pub mod accounts;
pub mod auth;
pub mod home;
pub mod routes;
pub mod users;

pub use routes::build_router;

use crate::controller::RequestContext;
use crate::security::Validator;
use crate::session::Notification;

/// Turn each failed field into a warning notification.
fn notify_invalid(ctx: &mut RequestContext<'_>, validator: &Validator<'_>) {
    for error in validator.errors().values() {
        ctx.notify(Notification::warning(error.message.clone()));
    }
}
