//! Layered configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//!  1. `/etc/queue-scope/service.yaml`  - system-wide defaults
//!  2. `./config/service.yaml`          - deployment-local override
//!  3. `--config` / `QS_CONFIG_FILE`    - operator-specified file
//!  4. Environment variables prefixed `QS__` (double-underscore separator),
//!     e.g. `QS__SERVER__PORT=9090` sets `server.port = 9090`
//!  5. Command-line flags
//!
//! Absent default files are fine; a malformed file, a missing explicit file
//! or a value that cannot be coerced is a hard error.

use crate::Args;
use queue_scope_api::{ConfigError, ServiceConfig};
use std::path::PathBuf;
use tracing::info;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

/// Where configuration is read from.
pub(crate) struct ConfigSources {
    /// File stems; `.yaml` and `.yml` are tried
    pub system_file: PathBuf,
    pub local_file: PathBuf,
    /// Replaces the process environment when set
    pub environment: Option<config::Map<String, String>>,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            system_file: PathBuf::from("/etc/queue-scope/service"),
            local_file: PathBuf::from("config/service"),
            environment: None,
        }
    }
}

/// Load, override and validate the service configuration.
pub(crate) fn load_config(args: &Args) -> Result<ServiceConfig, ConfigError> {
    load_config_from(args, ConfigSources::default())
}

pub(crate) fn load_config_from(
    args: &Args,
    sources: ConfigSources,
) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::from(sources.system_file.as_path())
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::from(sources.local_file.as_path())
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(explicit_path) = &args.config {
        info!(path = %explicit_path.display(), "Loading configuration from explicit path");
        builder = builder.add_source(config::File::from(explicit_path.as_path()).required(true));
    }

    let environment = config::Environment::with_prefix("QS")
        .separator("__")
        .source(sources.environment);

    let config = builder
        .add_source(environment)
        .build()
        .map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;

    let mut service_config: ServiceConfig =
        config.try_deserialize().map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;

    apply_overrides(&mut service_config, args);
    service_config.validate()?;
    Ok(service_config)
}

/// Command-line flags win over every other source.
fn apply_overrides(config: &mut ServiceConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.demo {
        config.backend.force_demo = true;
    }
    if args.live {
        config.backend.force_live = true;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}
