//! # Queue-Scope Service
//!
//! Binary entry point for the Queue-Scope debugging console.
//!
//! This executable:
//! - Loads configuration from files, environment and command line
//! - Initializes logging
//! - Selects the live SQS backend or the demo backend
//! - Starts the HTTP server from queue-scope-api

mod settings;

use clap::Parser;
use queue_scope_api::{config::LoggingConfig, select_backend, start_server};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for configuration that cannot be loaded or is invalid.
const CONFIG_EXIT_CODE: i32 = 3;

/// Debugging console for SQS queues
#[derive(Debug, Parser)]
#[command(name = "queue-scope", version, about)]
pub struct Args {
    /// Configuration file layered over the default locations
    #[arg(short, long, env = "QS_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long, env = "QS_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "QS_PORT")]
    pub port: Option<u16>,

    /// Serve fixture data without contacting AWS
    #[arg(long, conflicts_with = "live")]
    pub demo: bool,

    /// Fail at startup if AWS cannot be reached
    #[arg(long)]
    pub live: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loaded = settings::load_config(&args);
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(CONFIG_EXIT_CODE);
        }
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        force_demo = config.backend.force_demo,
        force_live = config.backend.force_live,
        "Starting Queue-Scope Service"
    );

    let selected = match select_backend(&config.backend).await {
        Ok(selected) => selected,
        Err(e) => {
            error!(error = %e, "Could not select a queue backend; aborting");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = start_server(config, selected).await {
        error!(error = %e, "Server failed");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(logging: &LoggingConfig) {
    let level = &logging.level;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "queue_scope_service={level},queue_scope_api={level},queue_scope_core={level},queue_scope_runtime={level},tower_http=debug"
        )
        .into()
    });

    let json = logging.json_format;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}
