use std::path::PathBuf;

use clap::Parser;

use mvc_skeleton::config::load_config;
use mvc_skeleton::lifecycle;
use mvc_skeleton::observability::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "mvc-skeleton", version, about = "Minimal MVC web application server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    init_logging(&config.observability.log_level);
    tracing::info!("mvc-skeleton v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        database = %config.database.dsn(),
        transactional_writes = config.database.transactional_writes,
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if let Err(e) = lifecycle::run(config).await {
        tracing::error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}
