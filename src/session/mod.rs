//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie (sid)
//!     → store.rs (checkout session by id, or start a new one)
//!     → state.rs (user, permissions, role, flashed notifications)
//!     → request handling mutates the session
//!     → store.rs (save back under the same id, or drop it when empty)
//! ```
//!
//! # Design Decisions
//! - Sessions live in process memory only
//! - Checkout copies; the stored entry is replaced on save, while the
//!   request still holds the connection lock
//! - Anonymous visitors with nothing to remember get no stored session
//! - Entries idle past `session.idle_timeout_secs` expire and are swept
//! - Notifications are collected per request; only those that must survive
//!   a redirect are flashed into the session

pub mod notification;
pub mod state;
pub mod store;

pub use notification::{Notification, NotificationKind};
pub use state::{Permission, Session};
pub use store::SessionStore;
