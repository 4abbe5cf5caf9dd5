//! Stdout sink: one JSON document per line

use super::{json_line, Sink};
use crate::error::Result;
use crate::types::EnhancedEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Stdout sink configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdoutConfig {}

/// Writes events to the process stdout
pub struct StdoutSink {
    // Serializes writers so lines from concurrent sends never interleave
    out: Mutex<tokio::io::Stdout>,
}

impl StdoutSink {
    pub fn new(_config: StdoutConfig) -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn send(&self, event: &EnhancedEvent) -> Result<()> {
        let line = json_line(event)?;
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    fn kind(&self) -> &str {
        "stdout"
    }
}
