use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::classify::Thresholds;
use crate::error::ConfigError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 4000;
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    Simulated,
}

impl SourceKind {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(SourceKind::Http),
            "simulated" | "sim" => Ok(SourceKind::Simulated),
            other => Err(ConfigError::Invalid(format!("unknown telemetry source '{}'", other))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub render_interval_ms: u64,
    pub source: SourceKind,
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint_url: "http://localhost:8000/telemetry".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            render_interval_ms: DEFAULT_RENDER_INTERVAL_MS,
            source: SourceKind::Http,
            thresholds: Thresholds::default(),
        }
    }
}

impl Config {
    /// Reads `CONFIG_FILE` when set, otherwise the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CONFIG_FILE") {
            Ok(path) => Self::load_from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let endpoint_url = env::var("TELEMETRY_URL").unwrap_or(defaults.endpoint_url);
        let source = match env::var("TELEMETRY_SOURCE") {
            Ok(value) => SourceKind::parse(&value)?,
            Err(_) => defaults.source,
        };

        let config = Config {
            endpoint_url,
            poll_interval_ms: get_env_var_u64("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            request_timeout_ms: get_env_var_u64("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS),
            render_interval_ms: get_env_var_u64("RENDER_INTERVAL_MS", DEFAULT_RENDER_INTERVAL_MS),
            source,
            thresholds: Thresholds {
                temperature_high_c: get_env_var_f64("TEMPERATURE_HIGH_C", defaults.thresholds.temperature_high_c),
                pressure_high_bar: get_env_var_f64("PRESSURE_HIGH_BAR", defaults.thresholds.pressure_high_bar),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be greater than zero".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be greater than zero".to_string()));
        }
        if self.render_interval_ms == 0 {
            return Err(ConfigError::Invalid("render_interval_ms must be greater than zero".to_string()));
        }
        if self.source == SourceKind::Http && self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint_url is required for the http source".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

fn get_env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

fn get_env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}
