//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DATABASE_HOST") {
        config.database.host = v;
    }
    if let Some(v) = lookup("DATABASE_SCHEMA") {
        config.database.schema = v;
    }
    if let Some(v) = lookup("DATABASE_USERNAME") {
        config.database.username = v;
    }
    if let Some(v) = lookup("DATABASE_PASSWORD") {
        config.database.password = v;
    }
    if let Some(v) = lookup("DATABASE_PORT") {
        config.database.port = v.parse().map_err(|_| ConfigError::Env {
            key: "DATABASE_PORT",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("DATABASE_TRANSACTIONAL_WRITES") {
        config.database.transactional_writes = match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::Env {
                    key: "DATABASE_TRANSACTIONAL_WRITES",
                    value: v,
                })
            }
        };
    }
    if let Some(v) = lookup("APP_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("APP_LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = lookup("APP_ADMIN_EMAIL") {
        config.admin.email = v;
    }
    if let Some(v) = lookup("APP_ADMIN_PASSWORD") {
        config.admin.initial_password = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            schema = ":memory:"
            transactional_writes = true

            [listener]
            bind_address = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.schema, ":memory:");
        assert!(config.database.transactional_writes);
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.session.cookie_name, "sid");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_HOST", "db.internal"),
            ("DATABASE_SCHEMA", "/var/lib/app/app.db"),
            ("DATABASE_PORT", "3307"),
            ("DATABASE_PASSWORD", "hunter2"),
            ("DATABASE_TRANSACTIONAL_WRITES", "yes"),
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.schema, "/var/lib/app/app.db");
        assert_eq!(config.database.port, 3307);
        assert!(config.database.transactional_writes);
        assert!(!format!("{:?}", config.database).contains("hunter2"));
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = AppConfig::default();
        let err = apply_overrides(&mut config, |k| {
            (k == "DATABASE_PORT").then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "DATABASE_PORT", .. }));
    }
}
