//! Controllers and the per-request context they run in.
//!
//! # Data Flow
//! ```text
//! Router (matched route: controller name + action name)
//!     → registry.rs (fresh controller instance per request)
//!     → Controller::call(action, ctx, args)
//!     → None when the action does not exist (router answers 404)
//! ```
//!
//! # Design Decisions
//! - Controllers are looked up by name so routes can be declared as data
//! - Unknown controller names fail at route registration
//! - Actions receive positional arguments: path captures, then query values

pub mod context;
pub mod registry;

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::DbError;
use crate::http::Response;

pub use context::RequestContext;
pub use registry::ControllerRegistry;

/// Failure inside an action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("missing argument #{0}")]
    MissingArgument(usize),

    #[error("{0}")]
    BadRequest(String),
}

impl ActionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ActionError::MissingArgument(_) | ActionError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

pub type ActionResult = Result<Response, ActionError>;

/// Positional arguments for an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<String>);

impl Args {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn require(&self, index: usize) -> Result<&str, ActionError> {
        self.get(index).ok_or(ActionError::MissingArgument(index))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A named group of actions.
pub trait Controller {
    /// Run `action`; `None` means the controller has no such action.
    fn call(&mut self, action: &str, ctx: &mut RequestContext<'_>, args: &Args) -> Option<ActionResult>;
}
