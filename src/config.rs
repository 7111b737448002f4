use crate::error::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StatusboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the scenario server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Health-check endpoint path
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Run-status endpoint path
    #[serde(default = "default_run_status_path")]
    pub run_status_path: String,

    /// Validation-status endpoint path
    #[serde(default = "default_validation_status_path")]
    pub validation_status_path: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollingConfig {
    /// Server health-check interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub server_interval_ms: u64,

    /// Run-status interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub run_status_interval_ms: u64,

    /// Validation-status interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub validation_status_interval_ms: u64,
}

/// Initial values for the local settings store
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SettingsConfig {
    /// Directory holding the scenario definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenarios_directory: Option<String>,

    /// Path to the GridPath database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridpath_database: Option<String>,

    /// Python environment used to run scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_environment: Option<String>,
}

impl PollingConfig {
    pub fn server_interval(&self) -> Duration {
        Duration::from_millis(self.server_interval_ms)
    }

    pub fn run_status_interval(&self) -> Duration {
        Duration::from_millis(self.run_status_interval_ms)
    }

    pub fn validation_status_interval(&self) -> Duration {
        Duration::from_millis(self.validation_status_interval_ms)
    }
}

impl StatusboardConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from_file("statusboard.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("server.base_url", default_base_url())?
            .set_default("server.health_path", default_health_path())?
            .set_default("server.run_status_path", default_run_status_path())?
            .set_default(
                "server.validation_status_path",
                default_validation_status_path(),
            )?
            .set_default(
                "server.request_timeout_ms",
                default_request_timeout_ms() as i64,
            )?
            .set_default("polling.server_interval_ms", default_interval_ms() as i64)?
            .set_default(
                "polling.run_status_interval_ms",
                default_interval_ms() as i64,
            )?
            .set_default(
                "polling.validation_status_interval_ms",
                default_interval_ms() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // STATUSBOARD_SERVER__BASE_URL, STATUSBOARD_POLLING__SERVER_INTERVAL_MS, ...
            .add_source(
                Environment::with_prefix("STATUSBOARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: StatusboardConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Server base_url must not be empty".to_string(),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Server request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let intervals = [
            ("server_interval_ms", self.polling.server_interval_ms),
            ("run_status_interval_ms", self.polling.run_status_interval_ms),
            (
                "validation_status_interval_ms",
                self.polling.validation_status_interval_ms,
            ),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Message(format!(
                    "Polling {} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Serialize to TOML, used by `--print-config`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_path: default_health_path(),
            run_status_path: default_run_status_path(),
            validation_status_path: default_validation_status_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            server_interval_ms: default_interval_ms(),
            run_status_interval_ms: default_interval_ms(),
            validation_status_interval_ms: default_interval_ms(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_health_path() -> String {
    "/server-status".to_string()
}
fn default_run_status_path() -> String {
    "/run-status".to_string()
}
fn default_validation_status_path() -> String {
    "/validation-status".to_string()
}
fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_interval_ms() -> u64 {
    5000
}
