//! Route guards.
//!
//! # Responsibilities
//! - Parse `Middleware::Method[:arg]*` specs into typed guards
//! - Check a guard's condition against the session
//! - Describe the redirect (and notification) for a failed check
//!
//! # Design Decisions
//! - Specs are parsed when routes are registered; a bad spec is a
//!   configuration error at startup, never at request time
//! - Method names match case-insensitively (`canChangePassword` and
//!   `CanChangePassword` are the same guard)
//! - Guards are stateless; all state comes from the session

use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::response::Redirect;
use crate::session::{Notification, Session};

/// Type name guard specs must use.
pub const GUARD_TYPE: &str = "Middleware";

/// Login page unauthenticated visitors are sent to.
pub const LOGIN_PATH: &str = "/auth/login";

/// A pre-dispatch check attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Logged in, and not in the middle of a forced password change.
    Auth,
    /// Logged in, whatever the password-change state.
    SignedIn,
    /// Session grants access to the named module.
    Permission(String),
    /// Not logged in.
    Guest,
    /// Session is allowed to change the password.
    CanChangePassword,
    /// Session role is `admin`.
    Admin,
}

/// Why a guard spec could not be turned into a [`Guard`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardSpecError {
    #[error("invalid middleware format: {0:?}")]
    Malformed(String),

    #[error("method {method} does not exist on {kind}")]
    Unknown { kind: String, method: String },

    #[error("middleware {method} takes {expected} argument(s), got {got}")]
    Arity {
        method: String,
        expected: usize,
        got: usize,
    },
}

impl FromStr for Guard {
    type Err = GuardSpecError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (kind, method_with_args) = spec
            .split_once("::")
            .ok_or_else(|| GuardSpecError::Malformed(spec.to_string()))?;

        let mut parts = method_with_args.split(':');
        let method = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        if kind != GUARD_TYPE {
            return Err(GuardSpecError::Unknown {
                kind: kind.to_string(),
                method: method.to_string(),
            });
        }

        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(GuardSpecError::Arity {
                    method: method.to_string(),
                    expected,
                    got: args.len(),
                })
            }
        };

        match method.to_ascii_lowercase().as_str() {
            "auth" => arity(0).map(|_| Guard::Auth),
            "signedin" => arity(0).map(|_| Guard::SignedIn),
            "permission" => arity(1).map(|_| Guard::Permission(args[0].to_string())),
            "guest" => arity(0).map(|_| Guard::Guest),
            "canchangepassword" => arity(0).map(|_| Guard::CanChangePassword),
            "admin" => arity(0).map(|_| Guard::Admin),
            _ => Err(GuardSpecError::Unknown {
                kind: kind.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Auth => write!(f, "{GUARD_TYPE}::Auth"),
            Guard::SignedIn => write!(f, "{GUARD_TYPE}::SignedIn"),
            Guard::Permission(module) => write!(f, "{GUARD_TYPE}::Permission:{module}"),
            Guard::Guest => write!(f, "{GUARD_TYPE}::Guest"),
            Guard::CanChangePassword => write!(f, "{GUARD_TYPE}::CanChangePassword"),
            Guard::Admin => write!(f, "{GUARD_TYPE}::Admin"),
        }
    }
}

/// A failed guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Status the denial stands for; the redirect itself goes out as 302.
    pub status: StatusCode,
    pub redirect: Redirect,
    pub notification: Option<Notification>,
}

impl Rejection {
    fn redirect(redirect: Redirect) -> Self {
        Self {
            status: StatusCode::FOUND,
            redirect,
            notification: None,
        }
    }

    fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            redirect: Redirect::Previous,
            notification: Some(Notification::danger(message)),
        }
    }
}

impl Guard {
    /// Check the guard against `session`.
    pub fn check(&self, session: &Session) -> Result<(), Rejection> {
        match self {
            Guard::Auth => {
                if !session.is_authenticated() || session.allowed_update_password {
                    return Err(Rejection::redirect(Redirect::to(LOGIN_PATH)));
                }
            }
            Guard::SignedIn => {
                if !session.is_authenticated() {
                    return Err(Rejection::redirect(Redirect::to(LOGIN_PATH)));
                }
            }
            Guard::Permission(module) => {
                if !session.has_permission(module) {
                    return Err(Rejection::forbidden("User lacks permission!"));
                }
            }
            Guard::Guest => {
                if session.is_authenticated() {
                    return Err(Rejection::redirect(Redirect::Home));
                }
            }
            Guard::CanChangePassword => {
                if !session.allowed_update_password {
                    return Err(Rejection::forbidden("User lacks permission!"));
                }
            }
            Guard::Admin => {
                if !session.is_admin() {
                    return Err(Rejection::forbidden("Access restricted to administrators!"));
                }
            }
        }
        Ok(())
    }
}
