//! Configuration management for the emitter host.
//!
//! Loads the host configuration from a TOML file, writing a default file when
//! none exists yet.

use loop_emitter::EmitterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_workers() -> usize {
    4
}

fn default_events_per_worker() -> usize {
    25
}

fn default_event_name() -> String {
    "work:progress".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Owning-thread and bridge settings
    #[serde(default)]
    pub emitter: EmitterConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Workload run against the emitter
    #[serde(default)]
    pub demo: DemoSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

/// Worker threads submitting async emissions to the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Async emissions submitted by each worker
    #[serde(default = "default_events_per_worker")]
    pub events_per_worker: usize,
    /// Event the workers emit
    #[serde(default = "default_event_name")]
    pub event_name: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            events_per_worker: default_events_per_worker(),
            event_name: default_event_name(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating it with defaults when
    /// the file does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.emitter.validate().map_err(|e| e.to_string())?;

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(format!("Invalid log level: {}", self.logging.level));
        }

        if self.demo.workers == 0 {
            return Err("demo.workers must be at least 1".to_string());
        }

        if self.demo.event_name.is_empty() {
            return Err("demo.event_name must not be empty".to_string());
        }

        Ok(())
    }
}
