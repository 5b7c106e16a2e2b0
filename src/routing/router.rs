//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store registered routes in registration order
//! - Look up the first route matching method and path
//! - Run the route's guards, then the controller action
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(n) scan in registration order; first match wins
//! - Guard specs and controller names are validated at registration
//! - Explicit NotFound rather than a fallback route

use std::time::Instant;

use thiserror::Error;

use crate::controller::{Args, ControllerRegistry, RequestContext};
use crate::http::{Method, Response};
use crate::observability::metrics;
use crate::routing::matcher::{normalize_path, PathPattern};
use crate::security::{Guard, GuardSpecError};
use crate::session::Notification;

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {method} {path}: unknown controller {controller:?}")]
    UnknownController {
        method: Method,
        path: String,
        controller: String,
    },

    #[error("route {method} {path}: {source}")]
    Guard {
        method: Method,
        path: String,
        #[source]
        source: GuardSpecError,
    },
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    /// Normalized path text (`/` + trimmed).
    pub path: String,
    pub pattern: PathPattern,
    pub controller: String,
    pub action: String,
    pub guards: Vec<Guard>,
}

/// How a request left the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran and produced the response.
    Dispatched,
    /// A guard redirected before the action ran.
    Halted,
    /// No route matched, or the controller lacks the action.
    NotFound,
    /// The action returned an error.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Dispatched => "dispatched",
            Outcome::Halted => "halted",
            Outcome::NotFound => "not_found",
            Outcome::Failed => "failed",
        }
    }
}

/// Result of [`Router::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub outcome: Outcome,
    pub response: Response,
}

impl Dispatch {
    fn new(outcome: Outcome, response: Response) -> Self {
        Self { outcome, response }
    }
}

/// Ordered route table bound to a controller registry.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    controllers: ControllerRegistry,
}

impl Router {
    pub fn new(controllers: ControllerRegistry) -> Self {
        Self {
            routes: Vec::new(),
            controllers,
        }
    }

    /// Register a route. `handler` is `(controller, action)`; `middlewares`
    /// are guard specs such as `Middleware::Permission:BILLING`.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: (&str, &str),
        middlewares: &[&str],
    ) -> Result<&mut Self, RouteError> {
        let path = normalize_path(path);
        let (controller, action) = handler;

        if !self.controllers.contains(controller) {
            return Err(RouteError::UnknownController {
                method,
                path,
                controller: controller.to_string(),
            });
        }

        let guards = middlewares
            .iter()
            .map(|spec| spec.parse::<Guard>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RouteError::Guard {
                method,
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            method = %method,
            path = %path,
            controller,
            action,
            guards = guards.len(),
            "Route registered"
        );

        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(&path),
            path,
            controller: controller.to_string(),
            action: action.to_string(),
            guards,
        });
        Ok(self)
    }

    pub fn get(&mut self, path: &str, handler: (&str, &str), middlewares: &[&str]) -> Result<&mut Self, RouteError> {
        self.add_route(Method::Get, path, handler, middlewares)
    }

    pub fn post(&mut self, path: &str, handler: (&str, &str), middlewares: &[&str]) -> Result<&mut Self, RouteError> {
        self.add_route(Method::Post, path, handler, middlewares)
    }

    pub fn put(&mut self, path: &str, handler: (&str, &str), middlewares: &[&str]) -> Result<&mut Self, RouteError> {
        self.add_route(Method::Put, path, handler, middlewares)
    }

    pub fn delete(&mut self, path: &str, handler: (&str, &str), middlewares: &[&str]) -> Result<&mut Self, RouteError> {
        self.add_route(Method::Delete, path, handler, middlewares)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching `method` and `path`, with its captures.
    pub fn match_route(&self, method: Method, path: &str) -> Option<(&Route, Vec<String>)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.pattern.matches(path).map(|captures| (route, captures)))
    }

    /// Run `guards` in order. Returns the redirect of the first one that fails.
    pub fn run_middlewares(guards: &[Guard], ctx: &mut RequestContext<'_>) -> Option<Response> {
        for guard in guards {
            if let Err(rejection) = guard.check(ctx.session) {
                tracing::warn!(
                    guard = %guard,
                    status = rejection.status.as_u16(),
                    path = %ctx.request.path,
                    "Guard rejected request"
                );
                metrics::record_guard_rejection(&guard.to_string());

                if let Some(notification) = rejection.notification {
                    ctx.notify(notification);
                }
                let location = rejection.redirect.resolve(ctx.request.referer.as_deref());
                return Some(Response::redirect(location));
            }
        }
        None
    }

    /// Route the request in `ctx` and produce its response.
    pub fn dispatch(&self, ctx: &mut RequestContext<'_>) -> Dispatch {
        let start = Instant::now();
        let method = ctx.request.method;

        let Some((route, captures)) = self.match_route(method, &ctx.request.path) else {
            tracing::debug!(method = %method, path = %ctx.request.path, "No route matched");
            return Dispatch::new(Outcome::NotFound, Response::not_found());
        };

        if let Some(response) = Self::run_middlewares(&route.guards, ctx) {
            return Dispatch::new(Outcome::Halted, response);
        }

        let Some(mut controller) = self.controllers.instantiate(&route.controller) else {
            tracing::error!(controller = %route.controller, "Controller vanished from registry");
            return Dispatch::new(Outcome::NotFound, Response::not_found());
        };

        let mut args = captures;
        args.extend(ctx.request.query.iter().map(|(_, value)| value.clone()));
        let args = Args::new(args);

        let dispatch = match controller.call(&route.action, ctx, &args) {
            Some(Ok(response)) => Dispatch::new(Outcome::Dispatched, response),
            Some(Err(e)) => {
                let status = e.status();
                tracing::error!(
                    controller = %route.controller,
                    action = %route.action,
                    error = %e,
                    "Action failed"
                );
                let message = if status.is_server_error() {
                    "Something went wrong while handling your request.".to_string()
                } else {
                    e.to_string()
                };
                Dispatch::new(Outcome::Failed, Response::error(status, &message))
            }
            None => {
                tracing::warn!(
                    controller = %route.controller,
                    action = %route.action,
                    "Action not found"
                );
                ctx.notify(Notification::warning("Method not found!"));
                Dispatch::new(Outcome::NotFound, Response::not_found())
            }
        };

        tracing::debug!(
            controller = %route.controller,
            action = %route.action,
            outcome = dispatch.outcome.as_str(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
        dispatch
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::controller::{ActionError, ActionResult, Controller};
    use crate::db::{Connection, Record};
    use crate::http::Request;
    use crate::security::GuardSpecError;
    use crate::session::{Permission, Session};

    /// Echoes its arguments and counts action calls.
    struct Recorder {
        calls: Arc<AtomicUsize>,
    }

    impl Controller for Recorder {
        fn call(&mut self, action: &str, _ctx: &mut RequestContext<'_>, args: &Args) -> Option<ActionResult> {
            let result = match action {
                "echo" => Ok(Response::page("Echo", args.as_slice().join(","))),
                "fail" => Err(ActionError::BadRequest("bad input".into())),
                _ => return None,
            };
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(result)
        }
    }

    fn router() -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ControllerRegistry::new();
        let counter = calls.clone();
        registry.register_with("Recorder", move || Box::new(Recorder { calls: counter.clone() }));
        (Router::new(registry), calls)
    }

    fn run(router: &Router, request: Request, session: &mut Session) -> (Dispatch, Vec<Notification>) {
        let conn = Connection::open_in_memory().unwrap();
        let mut ctx = RequestContext::new(&request, session, &conn);
        let dispatch = router.dispatch(&mut ctx);
        (dispatch, ctx.take_notifications())
    }

    fn page_content(response: &Response) -> &str {
        match response {
            Response::Page { content, .. } => content,
            Response::Redirect { .. } => panic!("expected a page"),
        }
    }

    #[test]
    fn test_disjoint_routes() {
        let (mut router, _) = router();
        router
            .get("/a", ("Recorder", "echo"), &[])
            .unwrap()
            .post("/b", ("Recorder", "echo"), &[])
            .unwrap();

        assert!(router.match_route(Method::Get, "/a").is_some());
        assert!(router.match_route(Method::Post, "/a").is_none());
        assert!(router.match_route(Method::Post, "/b").is_some());
        assert!(router.match_route(Method::Get, "/c").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let (mut router, _) = router();
        router.get("/x/{id}", ("Recorder", "echo"), &[]).unwrap();
        router.get("/x/{name}", ("Recorder", "fail"), &[]).unwrap();

        let (route, captures) = router.match_route(Method::Get, "/x/7").unwrap();
        assert_eq!(route.action, "echo");
        assert_eq!(captures, vec!["7".to_string()]);
    }

    #[test]
    fn test_captures_then_query_values() {
        let (mut router, calls) = router();
        router.get("/users/{id}", ("Recorder", "echo"), &[]).unwrap();

        let mut session = Session::default();
        let (dispatch, _) = run(&router, Request::new(Method::Get, "/users/42?tab=roles&page=2"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::Dispatched);
        assert_eq!(page_content(&dispatch.response), "42,roles,2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unmatched_path_is_not_found() {
        let (router, calls) = router();
        let mut session = Session::default();
        let (dispatch, _) = run(&router, Request::new(Method::Get, "/nowhere"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::NotFound);
        assert_eq!(dispatch.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_action_warns_and_404s() {
        let (mut router, _) = router();
        router.get("/ghost", ("Recorder", "missing"), &[]).unwrap();

        let mut session = Session::default();
        let (dispatch, notifications) = run(&router, Request::new(Method::Get, "/ghost"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::NotFound);
        assert_eq!(dispatch.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(notifications, vec![Notification::warning("Method not found!")]);
    }

    #[test]
    fn test_auth_guard_halts_before_action() {
        let (mut router, calls) = router();
        router.get("/secret", ("Recorder", "echo"), &["Middleware::Auth"]).unwrap();

        let mut session = Session::default();
        let (dispatch, _) = run(&router, Request::new(Method::Get, "/secret"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::Halted);
        assert_eq!(dispatch.response, Response::redirect("/auth/login"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_permission_guard_with_argument() {
        let (mut router, calls) = router();
        router
            .get(
                "/billing",
                ("Recorder", "echo"),
                &["Middleware::Auth", "Middleware::Permission:BILLING"],
            )
            .unwrap();

        let mut session = Session::default();
        session.log_in(Record::new(), vec![Permission::new("REPORTS", true)], None);
        let request = Request::new(Method::Get, "/billing").with_referer("/reports");
        let (dispatch, notifications) = run(&router, request, &mut session);
        assert_eq!(dispatch.outcome, Outcome::Halted);
        assert_eq!(dispatch.response, Response::redirect("/reports"));
        assert_eq!(notifications, vec![Notification::danger("User lacks permission!")]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        session.log_in(Record::new(), vec![Permission::new("BILLING", true)], None);
        let (dispatch, _) = run(&router, Request::new(Method::Get, "/billing"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::Dispatched);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_action_error_becomes_error_page() {
        let (mut router, _) = router();
        router.get("/fail", ("Recorder", "fail"), &[]).unwrap();

        let mut session = Session::default();
        let (dispatch, _) = run(&router, Request::new(Method::Get, "/fail"), &mut session);
        assert_eq!(dispatch.outcome, Outcome::Failed);
        assert_eq!(dispatch.response.status(), StatusCode::BAD_REQUEST);
        assert!(page_content(&dispatch.response).contains("bad input"));
    }

    #[test]
    fn test_registration_errors() {
        let (mut router, _) = router();
        assert!(matches!(
            router.get("/a", ("Nobody", "index"), &[]),
            Err(RouteError::UnknownController { .. })
        ));
        assert!(matches!(
            router.get("/a", ("Recorder", "echo"), &["Middleware::Permission"]),
            Err(RouteError::Guard {
                source: GuardSpecError::Arity { .. },
                ..
            })
        ));
        assert!(router.routes().is_empty());
    }
}
