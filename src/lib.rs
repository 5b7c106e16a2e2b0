//! Minimal MVC web framework.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum catch-all, request id, tracing)
//!                         │
//!                         ▼
//!                     session (cookie → Session checkout)
//!                         │
//!                         ▼
//!                     routing (first matching route, captures)
//!                         │
//!                         ▼
//!                     security::guards (Middleware::Auth, Permission:X, ...)
//!                         │
//!                         ▼
//!                     controller (fresh instance, action + args)
//!                         │
//!                         ▼
//!                     db (Model over the shared Connection)
//!                         │
//!     Client Response     ▼
//!     ◀────────────── http::response + view (page or redirect, notifications)
//! ```

// Core subsystems
pub mod config;
pub mod db;
pub mod http;
pub mod routing;

// Application layer
pub mod app;
pub mod controller;
pub mod session;
pub mod view;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
