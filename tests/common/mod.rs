//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tokio::net::TcpListener;

use mvc_skeleton::app::accounts::{self, NewUser};
use mvc_skeleton::db::{Connection, Model};
use mvc_skeleton::session::SessionStore;
use mvc_skeleton::{AppConfig, Shutdown};

pub const ADMIN_EMAIL: &str = "root@example.com";
pub const ADMIN_PASSWORD: &str = "first-login";

/// A running server on an ephemeral port with an in-memory database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub sessions: Arc<SessionStore>,
    db: Arc<Mutex<Connection>>,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)], cookie: Option<&str>) -> Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Sign in and return the session cookie.
    pub async fn log_in(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", password)], None)
            .await;
        assert_eq!(response.status(), 302);
        session_cookie(&response).expect("session cookie")
    }

    /// Insert a user straight into the database.
    pub fn create_user(&self, name: &str, email: &str, password: &str, modules: &[&str]) -> String {
        let conn = self.db.lock().unwrap();
        accounts::create_user(
            &Model::new(&conn),
            &NewUser {
                name,
                email,
                password,
                role: "user",
                must_change_password: false,
                modules,
            },
        )
        .unwrap()
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the application with test settings.
pub async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.database.schema = ":memory:".into();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.admin.email = ADMIN_EMAIL.into();
    config.admin.initial_password = ADMIN_PASSWORD.into();

    let server = mvc_skeleton::lifecycle::prepare(config).unwrap();
    let db = server.state().db.clone();
    let sessions = server.state().sessions.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, stop).await.unwrap();
    });

    let client = Client::builder().redirect(Policy::none()).build().unwrap();
    TestApp {
        addr,
        client,
        sessions,
        db,
        shutdown,
    }
}

/// `name=value` pair from the Set-Cookie header, ready for a Cookie header.
pub fn session_cookie(response: &Response) -> Option<String> {
    let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    header.split(';').next().map(|pair| pair.trim().to_string())
}

#[allow(dead_code)]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
