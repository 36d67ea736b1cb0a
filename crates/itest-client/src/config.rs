//! Harness configuration with TOML support
//!
//! Built once per run and handed to [`Services::new`](crate::Services::new);
//! nothing in the harness reads addresses from global state.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::poll::PollPolicy;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

/// Harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base addresses of the services under test
    #[serde(default)]
    pub services: ServicesConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// Eventual-consistency polling budget
    #[serde(default)]
    pub polling: PollingConfig,

    /// Suite execution settings
    #[serde(default)]
    pub suite: SuiteConfig,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Service base addresses (including the API version prefix)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_config_url")]
    pub config: String,

    #[serde(default = "default_device_management_url")]
    pub device_management: String,

    #[serde(default = "default_telemetry_url")]
    pub telemetry: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            config: default_config_url(),
            device_management: default_device_management_url(),
            telemetry: default_telemetry_url(),
        }
    }
}

fn default_config_url() -> String {
    "http://127.0.0.1:9005/v1".to_string()
}

fn default_device_management_url() -> String {
    "http://127.0.0.1:9002/v1".to_string()
}

fn default_telemetry_url() -> String {
    "http://127.0.0.1:9004/v1".to_string()
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Request timeout in milliseconds (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Connect timeout in milliseconds (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_timeout(),
            connect_ms: default_connect_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

/// Polling budget for cross-service preconditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum probe calls per poll (default: 5)
    #[serde(default = "default_poll_attempts")]
    pub attempts: u32,

    /// Delay between probe calls in milliseconds (default: 10s)
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            attempts: default_poll_attempts(),
            interval_ms: default_poll_interval(),
        }
    }
}

fn default_poll_attempts() -> u32 {
    PollPolicy::DEPENDENCY.max_attempts
}

fn default_poll_interval() -> u64 {
    PollPolicy::DEPENDENCY.interval.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Scenarios executed concurrently (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Invalid harness config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Create a builder for programmatic configuration
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Reject values that would make every run fail or hang
    pub fn validate(&self) -> Result<()> {
        if self.suite.workers == 0 {
            return Err(HarnessError::Config("suite.workers must be at least 1".into()));
        }
        if self.timeouts.request_ms == 0 {
            return Err(HarnessError::Config(
                "timeouts.request_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect_ms)
    }

    /// Polling policy for dependencies such as device groups and seed data
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.polling.attempts,
            Duration::from_millis(self.polling.interval_ms),
        )
    }
}

/// Builder for HarnessConfig
#[derive(Debug, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn config_url(mut self, url: impl Into<String>) -> Self {
        self.config.services.config = url.into();
        self
    }

    pub fn device_management_url(mut self, url: impl Into<String>) -> Self {
        self.config.services.device_management = url.into();
        self
    }

    pub fn telemetry_url(mut self, url: impl Into<String>) -> Self {
        self.config.services.telemetry = url.into();
        self
    }

    /// Set request timeout in milliseconds
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.request_ms = ms;
        self
    }

    /// Set the polling budget
    pub fn polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.config.polling = PollingConfig {
            attempts,
            interval_ms: interval.as_millis() as u64,
        };
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.suite.workers = workers;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.services.telemetry, "http://127.0.0.1:9004/v1");
        assert_eq!(config.services.config, "http://127.0.0.1:9005/v1");
        assert_eq!(config.poll_policy(), PollPolicy::DEPENDENCY);
        assert_eq!(config.suite.workers, 4);
        assert_eq!(config.request_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
[services]
telemetry = "http://telemetry:9004/v1"

[timeouts]
request_ms = 2500

[polling]
attempts = 3
interval_ms = 250

[headers]
X-Foo = "Bar"
"#;

        let config = HarnessConfig::from_toml(toml).unwrap();
        assert_eq!(config.services.telemetry, "http://telemetry:9004/v1");
        assert_eq!(config.services.config, "http://127.0.0.1:9005/v1");
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(
            config.poll_policy(),
            PollPolicy::new(3, Duration::from_millis(250))
        );
        assert_eq!(config.headers.get("X-Foo").map(String::as_str), Some("Bar"));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let result = HarnessConfig::from_toml("[suite]\nworkers = 0\n");
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_from_file_round_trip() {
        let config = HarnessConfig::builder()
            .telemetry_url("http://10.0.0.5:9004/v1")
            .polling(2, Duration::from_secs(1))
            .workers(2)
            .build();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = HarnessConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = HarnessConfig::from_toml_file("/nonexistent/itest.toml");
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
