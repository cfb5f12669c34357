//! Application configuration loaded from JSON.
//!
//! ```json
//! {
//!   "log_level": "info",
//!   "services": [{ "name": "order-gateway", "warmup": true }],
//!   "requests": {
//!     "new_order": { "timeout_ns": 5000000000, "init_delay_ns": 100000000, "max_retry_attempts": 3 }
//!   }
//! }
//! ```

use crate::lifecycle::ServiceMode;
use crate::request::{RetrySetting, SettingViolation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One problem found while validating an [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigViolation {
    #[error("request type {request_type}: {violation}")]
    RetrySetting {
        request_type: String,
        violation: SettingViolation,
    },

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service {0} is declared more than once")]
    DuplicateService(String),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {} violation(s)", .0.len())]
    Invalid(Vec<ConfigViolation>),
}

/// Lifecycle settings of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub warmup: bool,
    #[serde(default)]
    pub mode: ServiceMode,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "AppConfig::default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Retry policy per request type.
    #[serde(default)]
    pub requests: BTreeMap<String, RetrySetting>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            services: Vec::new(),
            requests: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check every service and retry setting, reporting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut checks: Vec<Validation<(), NonEmptyVec<ConfigViolation>>> = Vec::new();

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                checks.push(Validation::fail(ConfigViolation::EmptyServiceName));
            } else if !seen.insert(service.name.as_str()) {
                checks.push(Validation::fail(ConfigViolation::DuplicateService(
                    service.name.clone(),
                )));
            }
        }

        for (request_type, setting) in &self.requests {
            for violation in setting.violations() {
                checks.push(Validation::fail(ConfigViolation::RetrySetting {
                    request_type: request_type.clone(),
                    violation,
                }));
            }
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => {
                Err(ConfigError::Invalid(errors.iter().cloned().collect()))
            }
        }
    }

    pub fn retry_setting(&self, request_type: &str) -> Option<&RetrySetting> {
        self.requests.get(request_type)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|service| service.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Growth;

    const VALID: &str = r#"{
        "log_level": "debug",
        "services": [
            { "name": "order-gateway", "warmup": true },
            { "name": "risk", "mode": "recovery" }
        ],
        "requests": {
            "new_order": {
                "timeout_ns": 5000000000,
                "init_delay_ns": 100000000,
                "max_retry_attempts": 3,
                "growth": "exponential"
            }
        }
    }"#;

    #[test]
    fn parses_valid_config() {
        let config = AppConfig::from_json_str(VALID).unwrap();

        assert_eq!(config.log_level, "debug");
        assert!(config.service("order-gateway").is_some_and(|s| s.warmup));
        assert_eq!(
            config.service("risk").map(|s| s.mode),
            Some(ServiceMode::Recovery)
        );
        let setting = config.retry_setting("new_order").unwrap();
        assert_eq!(setting.growth, Growth::Exponential);
        assert_eq!(setting.max_retry_attempts, 3);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn reports_every_violation() {
        let json = r#"{
            "services": [{ "name": "a" }, { "name": "a" }, { "name": "" }],
            "requests": {
                "bad": { "timeout_ns": 0, "init_delay_ns": 0, "max_retry_attempts": 2 }
            }
        }"#;

        match AppConfig::from_json_str(json) {
            Err(ConfigError::Invalid(violations)) => {
                assert_eq!(violations.len(), 4);
                assert!(violations.contains(&ConfigViolation::DuplicateService("a".into())));
                assert!(violations.contains(&ConfigViolation::EmptyServiceName));
                assert!(violations.contains(&ConfigViolation::RetrySetting {
                    request_type: "bad".into(),
                    violation: SettingViolation::ZeroTimeout,
                }));
            }
            other => panic!("Expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            AppConfig::load("/nonexistent/switchyard.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
