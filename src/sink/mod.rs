//! Sink trait: the output side of a receiver
//!
//! A receiver is a named sink. Sinks own their transport and are driven
//! by the [`ReceiverRegistry`](crate::registry::ReceiverRegistry), never
//! by the routing tree directly.

use crate::error::{ExporterError, Result};
use crate::types::EnhancedEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod file;
pub mod memory;
pub mod stdout;

pub use file::{FileConfig, FileSink};
pub use memory::MemorySink;
pub use stdout::{StdoutConfig, StdoutSink};

/// Core trait for event sinks
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one event
    async fn send(&self, event: &EnhancedEvent) -> Result<()>;

    /// Flush and release the sink
    ///
    /// Default implementation does nothing.
    async fn close(&self) {}

    /// Sink kind (e.g., "stdout", "file")
    fn kind(&self) -> &str;
}

/// Configuration of a named receiver
///
/// Exactly one sink section is expected; when several are present the
/// first in declaration order below wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<StdoutConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileConfig>,
}

impl ReceiverConfig {
    /// Construct the sink this receiver is configured with
    pub fn build_sink(&self) -> Result<Arc<dyn Sink>> {
        if let Some(config) = &self.stdout {
            return Ok(Arc::new(StdoutSink::new(config.clone())));
        }
        if let Some(config) = &self.file {
            let sink = FileSink::open(config).map_err(|e| ExporterError::Sink {
                receiver: self.name.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Arc::new(sink));
        }
        Err(ExporterError::Sink {
            receiver: self.name.clone(),
            reason: "no sink configured".to_string(),
        })
    }
}

/// Serialize an event as a single JSON line (trailing newline included)
pub(crate) fn json_line(event: &EnhancedEvent) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(line)
}
