//! Upstream notification sources
//!
//! A source yields add/update/delete notifications one at a time. The
//! watcher's loop task owns the source while running.

use crate::error::{ExporterError, Result};
use crate::types::Event;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

/// A change to an upstream event object
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Added(Event),
    Updated { old: Event, new: Event },
    Deleted(Event),
}

/// Async stream of notifications
#[async_trait]
pub trait EventSource: Send {
    /// Next notification; `None` once the source is exhausted
    async fn next(&mut self) -> Result<Option<Notification>>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Source fed through a tokio channel
///
/// The in-process source: embedders push notifications with the sender
/// returned by [`ChannelEventSource::new`].
pub struct ChannelEventSource {
    rx: mpsc::Receiver<Notification>,
}

impl ChannelEventSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<Notification>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next(&mut self) -> Result<Option<Notification>> {
        Ok(self.rx.recv().await)
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// One line of a watch stream: `{"type": "ADDED", "object": {...}}`
#[derive(Debug, Deserialize)]
struct WatchLine {
    #[serde(rename = "type")]
    kind: String,
    object: Event,
}

/// Source reading JSON watch lines from an async reader
///
/// Matches the output of `kubectl get events --watch --output-watch-events
/// -o json` compacted to one document per line. `MODIFIED` lines carry
/// no previous state, so `old` repeats the new object. Undecodable lines
/// are logged and skipped.
pub struct LinesEventSource<R> {
    name: String,
    lines: LinesStream<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LinesEventSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: LinesStream::new(reader.lines()),
        }
    }
}

fn parse_line(line: &str) -> Result<Option<Notification>> {
    let watch: WatchLine = serde_json::from_str(line)?;
    let notification = match watch.kind.as_str() {
        "ADDED" => Notification::Added(watch.object),
        "MODIFIED" => Notification::Updated {
            old: watch.object.clone(),
            new: watch.object,
        },
        "DELETED" => Notification::Deleted(watch.object),
        // BOOKMARK and friends carry no event
        _ => return Ok(None),
    };
    Ok(Some(notification))
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for LinesEventSource<R> {
    async fn next(&mut self) -> Result<Option<Notification>> {
        while let Some(line) = self.lines.next().await {
            let line = line.map_err(|e| ExporterError::Source(format!("{}: {}", self.name, e)))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(Some(notification)) => return Ok(Some(notification)),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(source = %self.name, error = %e, "Skipping undecodable watch line");
                }
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
