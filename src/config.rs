//! Exporter configuration
//!
//! Loaded from a YAML file:
//!
//! ```yaml
//! logLevel: info
//! logFormat: json
//! maxEventAgeSeconds: 5
//! route:
//!   drop:
//!     - namespace: "^kube-system$"
//!   match:
//!     - receiver: dump
//!   routes:
//!     - match:
//!         - type: Warning
//!           receiver: alerts
//! receivers:
//!   - name: dump
//!     stdout: {}
//!   - name: alerts
//!     file:
//!       path: /var/log/alerts.jsonl
//! ```

use crate::error::{ExporterError, Result};
use crate::metadata::DEFAULT_CACHE_SIZE;
use crate::registry::DEFAULT_BUFFER_SIZE;
use crate::route::Route;
use crate::sink::ReceiverConfig;
use crate::watcher::WatcherConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Top-level exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Default tracing filter; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Only handle events recorded in this namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Events last seen longer ago than this are ignored
    #[serde(default = "default_max_event_age_seconds")]
    pub max_event_age_seconds: u64,

    /// Objects kept per metadata cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Queued events per receiver before new ones are dropped
    #[serde(default = "default_receiver_buffer_size")]
    pub receiver_buffer_size: usize,

    #[serde(default)]
    pub route: Route,

    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_event_age_seconds() -> u64 {
    5
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_receiver_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            namespace: None,
            max_event_age_seconds: default_max_event_age_seconds(),
            cache_size: default_cache_size(),
            receiver_buffer_size: default_receiver_buffer_size(),
            route: Route::default(),
            receivers: Vec::new(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ExporterError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&yaml)?;

        tracing::debug!(
            path = %path.display(),
            receivers = config.receivers.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Check receiver names and route references
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for receiver in &self.receivers {
            if receiver.name.is_empty() {
                return Err(ExporterError::Config("receiver without a name".to_string()));
            }
            if !names.insert(receiver.name.as_str()) {
                return Err(ExporterError::Config(format!(
                    "duplicate receiver '{}'",
                    receiver.name
                )));
            }
        }

        if let Some(unknown) = self
            .route
            .receiver_names()
            .into_iter()
            .find(|name| !names.contains(name))
        {
            return Err(ExporterError::Config(format!(
                "route references unknown receiver '{}'",
                unknown
            )));
        }

        Ok(())
    }

    /// Watcher settings derived from this configuration
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            max_event_age: Duration::from_secs(self.max_event_age_seconds),
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }
}
