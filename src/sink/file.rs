//! File sink: appends JSON lines to a file

use super::{json_line, Sink};
use crate::error::Result;
use crate::types::EnhancedEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File sink configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Target file; created if missing, appended to otherwise
    pub path: PathBuf,
}

/// Appends one JSON line per event to a file
pub struct FileSink {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileSink {
    /// Open (or create) the target file for appending
    ///
    /// The parent directory must already exist.
    pub fn open(config: &FileConfig) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        tracing::debug!(path = %config.path.display(), "File sink opened");
        Ok(Self {
            path: config.path.clone(),
            file: Mutex::new(tokio::fs::File::from_std(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&self, event: &EnhancedEvent) -> Result<()> {
        let line = json_line(event)?;
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        Ok(())
    }

    async fn close(&self) {
        let mut file = self.file.lock().await;
        if let Err(e) = file.sync_all().await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to sync file sink");
        }
    }

    fn kind(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("a3s-exporter-test-{}.log", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_file_sink_appends_lines() {
        let path = temp_path();
        let sink = FileSink::open(&FileConfig { path: path.clone() }).unwrap();
        assert_eq!(sink.path(), path.as_path());
        assert_eq!(sink.kind(), "file");

        for reason in ["Failed", "BackOff"] {
            let event = EnhancedEvent::new(&Event {
                reason: reason.to_string(),
                ..Default::default()
            });
            sink.send(&event).await.unwrap();
        }
        sink.close().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["reason"], "Failed");

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_sink_keeps_existing_content() {
        let path = temp_path();
        std::fs::write(&path, "existing\n").unwrap();

        let sink = FileSink::open(&FileConfig { path: path.clone() }).unwrap();
        sink.send(&EnhancedEvent::new(&Event::default())).await.unwrap();
        sink.close().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing\n"));
        assert_eq!(content.lines().count(), 2);

        std::fs::remove_file(&path).unwrap();
    }
}
