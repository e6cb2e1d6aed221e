//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use queue_scope_core::{LiveTailConfig, TagFilter};
use queue_scope_runtime::AwsSqsConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Service configuration
///
/// Every field has a default, so partial configuration files are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Queue backend selection
    pub backend: BackendConfig,

    /// Queue listing settings
    pub directory: DirectoryConfig,

    /// Message browsing settings
    pub messages: MessagesConfig,

    /// Live-tail polling and heartbeat settings
    pub live_tail: LiveTailSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Reject settings the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when both force flags are set, when
    /// an interval is zero, or when the inactivity timeout would expire
    /// before the first heartbeat could be answered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.force_demo && self.backend.force_live {
            return Err(ConfigError::Invalid {
                message: "backend.force_demo and backend.force_live are mutually exclusive"
                    .to_string(),
            });
        }

        if self.live_tail.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "live_tail.poll_interval_ms must be greater than zero".to_string(),
            });
        }

        if self.live_tail.max_messages == 0 || self.live_tail.max_messages > 10 {
            return Err(ConfigError::Invalid {
                message: "live_tail.max_messages must be between 1 and 10".to_string(),
            });
        }

        if self.live_tail.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "live_tail.channel_capacity must be greater than zero".to_string(),
            });
        }

        if self.live_tail.ping_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "live_tail.ping_interval_seconds must be greater than zero".to_string(),
            });
        }

        if self.live_tail.inactivity_timeout_seconds <= self.live_tail.ping_interval_seconds {
            return Err(ConfigError::Invalid {
                message: format!(
                    "live_tail.inactivity_timeout_seconds ({}) must be greater than live_tail.ping_interval_seconds ({})",
                    self.live_tail.inactivity_timeout_seconds,
                    self.live_tail.ping_interval_seconds
                ),
            });
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "server.host".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            enable_cors: true,
            enable_compression: true,
        }
    }
}

/// Queue backend selection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    /// Use the demo backend without contacting AWS
    pub force_demo: bool,

    /// Fail startup instead of falling back to the demo backend
    pub force_live: bool,

    /// Live backend settings
    pub aws: AwsConfig,
}

/// Live SQS settings; anything unset comes from the AWS environment.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl AwsConfig {
    pub fn to_sqs_config(&self) -> AwsSqsConfig {
        AwsSqsConfig {
            region: non_empty(&self.region),
            profile: non_empty(&self.profile),
            endpoint_url: non_empty(&self.endpoint_url),
            access_key_id: non_empty(&self.access_key_id),
            secret_access_key: non_empty(&self.secret_access_key),
            session_token: non_empty(&self.session_token),
            request_timeout: self.request_timeout_seconds.map(Duration::from_secs),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepted values for one required tag.
///
/// Either a list, or a comma-separated string as environment variables
/// deliver it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValues {
    List(Vec<String>),
    Csv(String),
}

impl TagValues {
    pub fn values(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::List(values) => values.iter().flat_map(|v| v.split(',')).collect(),
            Self::Csv(values) => values.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Queue listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// List every queue regardless of `required_tags`
    pub disable_tag_filter: bool,

    /// Tag key to accepted values. Keys set through environment variables
    /// arrive lower-cased.
    pub required_tags: HashMap<String, TagValues>,

    /// `limit` used when `GET /api/queues` does not give one
    pub default_limit: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            disable_tag_filter: false,
            required_tags: HashMap::new(),
            default_limit: 20,
        }
    }
}

impl DirectoryConfig {
    /// The filter the directory should apply, if any.
    pub fn tag_filter(&self) -> Option<TagFilter> {
        if self.disable_tag_filter {
            return None;
        }

        let required: HashMap<String, Vec<String>> = self
            .required_tags
            .iter()
            .map(|(key, values)| (key.clone(), values.values()))
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let filter = TagFilter::new(required);
        (!filter.is_empty()).then_some(filter)
    }
}

/// Message browsing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessagesConfig {
    /// Long-poll wait for browse and statistics receives
    pub receive_wait_seconds: u32,
}

/// Live-tail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveTailSettings {
    pub poll_interval_ms: u64,
    pub max_messages: u32,
    pub wait_seconds: u32,
    pub ping_interval_seconds: u64,
    /// Connection is dropped when nothing arrives from the client for this long
    pub inactivity_timeout_seconds: u64,
    /// Pending events buffered per connection
    pub channel_capacity: usize,
}

impl Default for LiveTailSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            max_messages: 10,
            wait_seconds: 1,
            ping_interval_seconds: 30,
            inactivity_timeout_seconds: 75,
            channel_capacity: 64,
        }
    }
}

impl LiveTailSettings {
    pub fn poller_config(&self) -> LiveTailConfig {
        LiveTailConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_messages: self.max_messages,
            wait_seconds: self.wait_seconds,
        }
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
