//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, request ID, security headers)
//! - Translate axum requests into [`Request`] and rendered pages back
//! - Check sessions in and out around each dispatch
//! - Observability (metrics, correlation IDs)
//!
//! # Design Decisions
//! - The database connection sits behind one mutex: requests are handled
//!   one at a time, inside `spawn_blocking`, for their whole duration
//! - Routing is ours, not axum's; axum only sees `/` and `/{*path}`
//! - A session cookie is only sent while the store keeps the session

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response as AxumResponse},
    routing::any,
    Router as AxumRouter,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::controller::RequestContext;
use crate::db::Connection;
use crate::http::request::{Method, Request};
use crate::http::response::{self, Rendered};
use crate::observability::metrics;
use crate::routing::{Outcome, Router};
use crate::session::SessionStore;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub db: Arc<Mutex<Connection>>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<AppConfig>,
}

/// HTTP front end for the router.
pub struct HttpServer {
    router: AxumRouter,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: AppConfig, router: Router, connection: Connection) -> Self {
        let state = AppState {
            router: Arc::new(router),
            db: Arc::new(Mutex::new(connection)),
            sessions: Arc::new(SessionStore::new(Duration::from_secs(config.session.idle_timeout_secs))),
            config: Arc::new(config),
        };
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> AxumRouter {
        let timeout = Duration::from_secs(state.config.listener.request_timeout_secs);

        AxumRouter::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::X_CONTENT_TYPE_OPTIONS,
                        HeaderValue::from_static("nosniff"),
                    ))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.state.router.routes().len(),
            "HTTP server starting"
        );

        let sweep_every = Duration::from_secs(self.state.config.session.sweep_interval_secs);
        tokio::spawn(sweep_sessions(self.state.sessions.clone(), sweep_every, shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Drop idle sessions every `every` until shutdown.
async fn sweep_sessions(sessions: Arc<SessionStore>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = sessions.purge_idle();
                if removed > 0 {
                    tracing::debug!(removed, remaining = sessions.len(), "Idle sessions swept");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Catch-all handler: every request goes through [`Router::dispatch`].
async fn dispatch_handler(State(state): State<AppState>, request: axum::extract::Request) -> AxumResponse {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let method = match parts.method.as_str().parse::<Method>() {
        Ok(method) => method,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request method");
            metrics::record_request(parts.method.as_str(), 405, "rejected", start.elapsed());
            return (StatusCode::METHOD_NOT_ALLOWED, e.to_string()).into_response();
        }
    };

    let body = match axum::body::to_bytes(body, state.config.listener.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Request body rejected");
            metrics::record_request(method.as_str(), 413, "rejected", start.elapsed());
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let uri = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let mut request = Request::new(method, uri);
    if is_form(&parts.headers) {
        request = request.with_form_body(&body);
    }
    if let Some(referer) = header_str(&parts.headers, header::REFERER.as_str()) {
        request = request.with_referer(referer);
    }
    if let Some(id) = header_str(&parts.headers, X_REQUEST_ID) {
        request = request.with_request_id(id);
    }

    let cookie_name = state.config.session.cookie_name.clone();
    let session_id = session_cookie(&parts.headers, &cookie_name);

    let blocking_state = state.clone();
    let handled = tokio::task::spawn_blocking(move || handle_blocking(&blocking_state, &request, session_id)).await;

    let (session_id, outcome, rendered) = match handled {
        Ok(handled) => handled,
        Err(e) => {
            tracing::error!(error = %e, "Request handler panicked");
            metrics::record_request(method.as_str(), 500, "failed", start.elapsed());
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    metrics::record_request(method.as_str(), rendered.status.as_u16(), outcome.as_str(), start.elapsed());
    into_axum(rendered, &cookie_name, session_id.as_deref())
}

/// Dispatch under the connection lock.
///
/// The session is saved before the lock is released, so the next request
/// with the same id sees this one's changes. Returns the session id when
/// the session was kept.
fn handle_blocking(
    state: &AppState,
    request: &Request,
    session_id: Option<String>,
) -> (Option<String>, Outcome, Rendered) {
    let conn = state.db.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Database lock poisoned by an earlier panic; recovering");
        let conn = poisoned.into_inner();
        if conn.in_transaction() {
            if let Err(e) = conn.roll_back() {
                tracing::error!(error = %e, "Rollback after panic failed");
            }
        }
        conn
    });

    let (id, mut session) = state.sessions.checkout(session_id.as_deref());

    let (dispatch, notifications) = {
        let mut ctx = RequestContext::new(request, &mut session, &conn)
            .with_transactional_writes(state.config.database.transactional_writes);
        let dispatch = state.router.dispatch(&mut ctx);
        (dispatch, ctx.take_notifications())
    };

    tracing::debug!(
        request_id = request.request_id.as_deref().unwrap_or("unknown"),
        method = %request.method,
        path = %request.path,
        outcome = dispatch.outcome.as_str(),
        status = dispatch.response.status().as_u16(),
        "Request handled"
    );

    let rendered = response::finish(dispatch.response, notifications, &mut session);
    let kept = state.sessions.save(id.clone(), session);
    drop(conn);

    tracing::trace!(kept, "Session saved");
    (kept.then_some(id), dispatch.outcome, rendered)
}

fn into_axum(rendered: Rendered, cookie_name: &str, session_id: Option<&str>) -> AxumResponse {
    let mut response = if rendered.location.is_some() {
        (rendered.status, Body::empty()).into_response()
    } else {
        (rendered.status, Html(rendered.html)).into_response()
    };

    let headers = response.headers_mut();
    if let Some(location) = rendered.location {
        match HeaderValue::from_str(&location) {
            Ok(value) => {
                headers.insert(header::LOCATION, value);
            }
            Err(_) => tracing::warn!(location = %location, "Redirect target is not a valid header value"),
        }
    }
    if let Some(session_id) = session_id {
        let cookie = format!("{cookie_name}={session_id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.insert(header::SET_COOKIE, value);
        }
    }
    response
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_form(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Value of cookie `name` from the Cookie header(s).
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
