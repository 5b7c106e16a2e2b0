//! Responses produced by actions and guards.
//!
//! # Responsibilities
//! - Describe a page or a redirect independent of the HTTP framework
//! - Resolve symbolic redirect targets (home, previous page)
//! - Finish a response: render pending notifications into pages, flash
//!   them into the session across redirects
//!
//! # Design Decisions
//! - Pages are rendered at completion so notifications added anywhere
//!   during the request show up exactly once
//! - Redirects always use 302, whatever status the caller intended

use axum::http::StatusCode;

use crate::session::{Notification, Session};
use crate::view;

/// Where a redirect should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// The site root.
    Home,
    /// The Referer, falling back to the site root.
    Previous,
    To(String),
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Redirect::To(location.into())
    }

    pub fn resolve(&self, referer: Option<&str>) -> String {
        match self {
            Redirect::Home => "/".to_string(),
            Redirect::Previous => referer.filter(|r| !r.is_empty()).unwrap_or("/").to_string(),
            Redirect::To(location) => location.clone(),
        }
    }
}

/// Result of handling a request, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Page {
        status: StatusCode,
        title: String,
        /// Inner HTML of the page body.
        content: String,
    },
    Redirect {
        location: String,
    },
}

impl Response {
    pub fn page(title: impl Into<String>, content: impl Into<String>) -> Self {
        Response::Page {
            status: StatusCode::OK,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Response::Redirect {
            location: location.into(),
        }
    }

    pub fn not_found() -> Self {
        Response::Page {
            status: StatusCode::NOT_FOUND,
            title: "Error 404".to_string(),
            content: view::not_found_content(),
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Response::Page {
            status,
            title: format!("Error {}", status.as_u16()),
            content: view::error_content(status, message),
        }
    }

    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            Response::Page { title, content, .. } => Response::Page { status, title, content },
            redirect => redirect,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Response::Page { status, .. } => *status,
            Response::Redirect { .. } => StatusCode::FOUND,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Response::Redirect { .. })
    }
}

/// A response ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: StatusCode,
    pub location: Option<String>,
    pub html: String,
}

/// Render `response`, consuming `notifications`.
///
/// Pages show them inline; redirects carry them over in the session.
pub fn finish(response: Response, notifications: Vec<Notification>, session: &mut Session) -> Rendered {
    match response {
        Response::Page { status, title, content } => Rendered {
            status,
            location: None,
            html: view::render_page(&title, &content, &notifications),
        },
        Response::Redirect { location } => {
            session.flash(notifications);
            Rendered {
                status: StatusCode::FOUND,
                location: Some(location),
                html: String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_targets() {
        assert_eq!(Redirect::Home.resolve(Some("/x")), "/");
        assert_eq!(Redirect::Previous.resolve(Some("/users")), "/users");
        assert_eq!(Redirect::Previous.resolve(None), "/");
        assert_eq!(Redirect::to("/auth/login").resolve(None), "/auth/login");
    }

    #[test]
    fn test_finish_page_renders_notifications() {
        let mut session = Session::default();
        let rendered = finish(
            Response::page("Home", "<p>hi</p>"),
            vec![Notification::success("Saved!")],
            &mut session,
        );
        assert_eq!(rendered.status, StatusCode::OK);
        assert!(rendered.html.contains("alert-success"));
        assert!(rendered.html.contains("Saved!"));
        assert!(session.pending_flash().is_empty());
    }

    #[test]
    fn test_finish_redirect_flashes_notifications() {
        let mut session = Session::default();
        let rendered = finish(
            Response::redirect("/"),
            vec![Notification::danger("Denied")],
            &mut session,
        );
        assert_eq!(rendered.status, StatusCode::FOUND);
        assert_eq!(rendered.location.as_deref(), Some("/"));
        assert_eq!(session.pending_flash().len(), 1);
    }
}
