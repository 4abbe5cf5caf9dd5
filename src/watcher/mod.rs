//! Event watcher: drives a notification source on a background task
//!
//! ```text
//! source.next() ──► on_add / on_update ──► staleness ──► checker ──► labels, annotations ──► handler
//!                   on_delete (ignored)
//! ```
//!
//! `start` spawns the loop and returns immediately; `stop` fires a one-shot
//! signal, waits for the loop to hand the source back, and leaves the
//! watcher ready to be started again. A notification already being handled
//! when `stop` is called runs to completion.

mod pipeline;
mod source;

pub use pipeline::{
    is_stale, EventChecker, EventHandler, EventPipeline, NotificationHandler,
    DEFAULT_MAX_EVENT_AGE,
};
pub use source::{ChannelEventSource, EventSource, LinesEventSource, Notification};

use crate::error::{ExporterError, Result};
use crate::metadata::MetadataLookup;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

/// Watcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    Running,
}

/// Watcher settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Notifications last seen longer ago than this are dropped
    pub max_event_age: Duration,

    /// Restrict handling to one namespace
    pub namespace: Option<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            max_event_age: DEFAULT_MAX_EVENT_AGE,
            namespace: None,
        }
    }
}

struct Running {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Box<dyn EventSource>>,
}

#[derive(Default)]
struct Inner {
    source: Option<Box<dyn EventSource>>,
    running: Option<Running>,
}

/// Subscribes to a notification source and feeds the event pipeline
pub struct Watcher {
    pipeline: Arc<EventPipeline>,
    inner: Mutex<Inner>,
    state: watch::Sender<WatcherState>,
}

impl Watcher {
    pub fn new(
        source: Box<dyn EventSource>,
        config: WatcherConfig,
        labels: Arc<dyn MetadataLookup>,
        annotations: Arc<dyn MetadataLookup>,
        handler: EventHandler,
        checker: EventChecker,
    ) -> Self {
        let pipeline = EventPipeline::new(labels, annotations, handler, checker)
            .with_max_event_age(config.max_event_age)
            .with_namespace(config.namespace);
        let (state, _) = watch::channel(WatcherState::Stopped);

        Self {
            pipeline: Arc::new(pipeline),
            inner: Mutex::new(Inner {
                source: Some(source),
                running: None,
            }),
            state,
        }
    }

    /// The pipeline notifications are dispatched into
    pub fn pipeline(&self) -> Arc<EventPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Launch the dispatch loop on a background task
    ///
    /// Fails if the watcher is already running or its source was lost.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(running) = inner.running.take() {
            if self.state() == WatcherState::Running {
                inner.running = Some(running);
                return Err(ExporterError::Watcher("watcher is already running".to_string()));
            }
            // The loop ended on its own and is only handing the source back
            match running.task.await {
                Ok(source) => inner.source = Some(source),
                Err(e) => tracing::error!(error = %e, "Event watcher task failed"),
            }
        }
        let source = inner.source.take().ok_or_else(|| {
            ExporterError::Watcher("notification source is no longer available".to_string())
        })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let handler: Arc<dyn NotificationHandler> = self.pipeline.clone();
        let state = self.state.clone();

        tracing::info!(source = %source.name(), "Starting event watcher");
        self.state.send_replace(WatcherState::Running);
        let task = tokio::spawn(async move {
            let source = run(source, handler, stop_rx).await;
            state.send_replace(WatcherState::Stopped);
            source
        });

        inner.running = Some(Running { stop_tx, task });
        Ok(())
    }

    /// Signal the dispatch loop to end and wait for it
    ///
    /// Returns `false` without doing anything when the watcher is not
    /// running, so calling it twice is harmless.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(running) = inner.running.take() else {
            tracing::debug!("Event watcher already stopped");
            return false;
        };

        // The loop may already have ended on its own
        let _ = running.stop_tx.send(());
        match running.task.await {
            Ok(source) => inner.source = Some(source),
            Err(e) => tracing::error!(error = %e, "Event watcher task failed"),
        }
        self.state.send_replace(WatcherState::Stopped);
        tracing::info!("Event watcher stopped");
        true
    }

    /// Resolve once the dispatch loop is no longer running
    ///
    /// Covers both `stop` and the source running dry.
    pub async fn wait_stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == WatcherState::Stopped).await;
    }
}

async fn run(
    mut source: Box<dyn EventSource>,
    handler: Arc<dyn NotificationHandler>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Box<dyn EventSource> {
    loop {
        let next = tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            next = source.next() => next,
        };

        match next {
            Ok(Some(Notification::Added(event))) => handler.on_add(&event).await,
            Ok(Some(Notification::Updated { old, new })) => handler.on_update(&old, &new).await,
            Ok(Some(Notification::Deleted(event))) => handler.on_delete(&event).await,
            Ok(None) => {
                tracing::info!(source = %source.name(), "Notification source exhausted");
                break;
            }
            Err(e) => {
                tracing::error!(source = %source.name(), error = %e, "Notification source failed");
                break;
            }
        }
    }
    source
}
