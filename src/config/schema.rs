//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the application.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// First administrator account.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Database connection settings.
///
/// The bundled SQLite driver opens `schema` as the database path
/// (`:memory:` for a private in-memory database). Host, port and
/// credentials are part of the connection string and logged at startup.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub schema: String,
    pub username: String,
    pub password: String,
    pub port: u16,

    /// Wrap every INSERT/UPDATE issued by the Model in its own transaction.
    pub transactional_writes: bool,

    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Connection string without the password.
    pub fn dsn(&self) -> String {
        format!("sqlite:{}", self.schema)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("transactional_writes", &self.transactional_writes)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            schema: "app.db".to_string(),
            username: String::new(),
            password: String::new(),
            port: 3306,
            transactional_writes: false,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Sessions unused for this long are discarded.
    pub idle_timeout_secs: u64,

    /// How often idle sessions are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Administrator seeded into an empty users table at startup.
///
/// The account must choose a new password on first sign-in. There is no
/// default password: seeding needs `initial_password` (or
/// `APP_ADMIN_PASSWORD`) to be set.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub seed: bool,
    pub email: String,
    pub initial_password: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("seed", &self.seed)
            .field("email", &self.email)
            .field("initial_password", &"<redacted>")
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            seed: true,
            email: "admin@example.com".to_string(),
            initial_password: String::new(),
        }
    }
}
