//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → request.rs (method, path, query, form, referer)
//!     → [routing layer: guards, controller action]
//!     → response.rs (render page or redirect, flash notifications)
//!     → Send to client (with session cookie)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Method, Request, UnsupportedMethod};
pub use response::{finish, Redirect, Rendered, Response};
pub use server::{AppState, HttpServer, X_REQUEST_ID};
