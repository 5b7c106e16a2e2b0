//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Controller action
//!     → model.rs (build INSERT/UPDATE/SELECT text, bind values)
//!     → connection.rs (prepare, bind, execute on the shared handle)
//!     → value.rs (rows decoded into Records)
//! ```
//!
//! # Design Decisions
//! - One handle opened at startup; failure to open is fatal for the binary
//! - Requests are serialized on the handle by the HTTP layer
//! - Transactions are single-level; nested begins are ignored

pub mod connection;
pub mod error;
pub mod model;
pub mod value;

pub use connection::Connection;
pub use error::{DbError, DbResult};
pub use model::{Criteria, Model};
pub use value::{Fields, Params, Record, Value};
