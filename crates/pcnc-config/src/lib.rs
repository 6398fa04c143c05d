//! Shared configuration for the PlanetCNC command client.
//!
//! Settings are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `PCNC_CONFIG_PATH`), then `PCNC_*`
//! environment variables, then command-line flags.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_PIPE_NAME, default_endpoint,
    default_log_filter_string, default_log_format,
};
pub use endpoint::{ControllerEndpoint, EndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the client library and the `pcnc` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PCNC")]
pub struct Config {
    /// Endpoint of the controller's command channel.
    #[ortho_config(default = default_endpoint())]
    pub endpoint: ControllerEndpoint,
    /// Bound on the initial connection attempt, in milliseconds.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint of the controller's command channel.
    #[must_use]
    pub const fn endpoint(&self) -> &ControllerEndpoint {
        &self.endpoint
    }

    /// Bound on the initial connection attempt.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for log events.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
