//! Emitter configuration.
//!
//! Embedded as the `[emitter]` table of a host application's TOML file, or
//! parsed on its own with [`EmitterConfig::from_toml_str`].

use crate::error::EmitterError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_loop_thread_name() -> String {
    "emitter-loop".to_string()
}

/// Tuning for the owning thread and the async bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Name given to the owning thread spawned by [`EventLoop`](crate::EventLoop)
    #[serde(default = "default_loop_thread_name")]
    pub loop_thread_name: String,
    /// Maximum queued jobs handled per wake-up, 0 drains the queue completely
    #[serde(default)]
    pub max_drain_per_wake: usize,
    /// Deliver everything still queued when the event loop stops instead of
    /// dropping it
    #[serde(default)]
    pub drain_on_shutdown: bool,
    /// Log a warning when an event is emitted with no listeners
    #[serde(default)]
    pub warn_on_unhandled: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            loop_thread_name: default_loop_thread_name(),
            max_drain_per_wake: 0,
            drain_on_shutdown: false,
            warn_on_unhandled: false,
        }
    }
}

impl EmitterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EmitterError> {
        let config: EmitterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, EmitterError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmitterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), EmitterError> {
        if self.loop_thread_name.trim().is_empty() {
            return Err(EmitterError::Config(
                "loop_thread_name must not be empty".to_string(),
            ));
        }
        if self.loop_thread_name.contains('\0') {
            return Err(EmitterError::Config(
                "loop_thread_name must not contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }
}
