//! Error types for a3s-event-exporter

use thiserror::Error;

/// Errors that can occur while loading, routing, or delivering events
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule pattern failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    /// Sink construction or delivery failure
    #[error("Sink error for receiver '{receiver}': {reason}")]
    Sink {
        receiver: String,
        reason: String,
    },

    /// The object an event refers to does not exist (anymore)
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Metadata lookup failure
    #[error("Metadata lookup failed for {object}: {reason}")]
    Lookup {
        object: String,
        reason: String,
    },

    /// Upstream notification source failure
    #[error("Source error: {0}")]
    Source(String),

    /// Watcher lifecycle misuse
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// JSON serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parse failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;
