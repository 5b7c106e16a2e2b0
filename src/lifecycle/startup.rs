//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the database and install the schema
//! - Seed the first administrator
//! - Register routes and start the metrics exporter
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: a config, database, schema or route error aborts startup
//! - A metrics exporter that fails to start is logged, not fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::app::{self, accounts};
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::db::{Connection, DbError, Model};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("routes: {0}")]
    Routes(#[from] RouteError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a ready-to-run server from `config`.
///
/// The configuration is validated again here, so a caller that built it by
/// hand cannot seed an administrator without a password.
pub fn prepare(config: AppConfig) -> Result<HttpServer, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let conn = Connection::open(&config.database)?;
    accounts::install(&conn)?;

    if config.admin.seed {
        let model = Model::new(&conn).with_transactions(config.database.transactional_writes);
        accounts::seed_admin(&model, &config.admin.email, &config.admin.initial_password)?;
    }

    let router = app::build_router()?;
    Ok(HttpServer::new(config, router, conn))
}

/// Start every subsystem and serve until a termination signal.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = prepare(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let stop = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, stop).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.schema = ":memory:".into();
        config
    }

    #[test]
    fn test_prepare_refuses_admin_without_password() {
        let err = prepare(in_memory()).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::Validation(ref errors))
                if errors.iter().any(|e| e.field == "admin.initial_password")
        ));
    }

    #[test]
    fn test_prepare_seeds_configured_admin() {
        let mut config = in_memory();
        config.admin.initial_password = "first-login".into();
        let server = prepare(config).unwrap();

        let conn = server.state().db.lock().unwrap();
        let admin = accounts::authenticate(&Model::new(&conn), "admin@example.com", "first-login").unwrap();
        assert!(admin.is_some());
    }
}
