//! Receiver registry: name-keyed set of sinks
//!
//! The routing tree only ever calls [`ReceiverRegistry::send_event`], which
//! must never block: delivery happens on per-receiver worker tasks, so a slow
//! sink cannot stall rule evaluation or other receivers.

use crate::sink::Sink;
use crate::types::EnhancedEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default per-receiver queue capacity
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Trait for receiver registries
///
/// Implementations must tolerate concurrent calls from several
/// notification callbacks at once.
#[async_trait]
pub trait ReceiverRegistry: Send + Sync {
    /// Register a sink under a receiver name
    fn register(&self, name: &str, sink: Arc<dyn Sink>);

    /// Hand an event to the named receiver (fire-and-forget)
    fn send_event(&self, name: &str, event: &EnhancedEvent);

    /// Close every registered sink
    async fn close(&self);
}

struct ReceiverChannel {
    sender: mpsc::Sender<Arc<EnhancedEvent>>,
    worker: JoinHandle<()>,
    sink: Arc<dyn Sink>,
}

/// Registry backed by one bounded queue and worker task per receiver
///
/// A full queue drops the event for that receiver only. Must be used
/// from within a tokio runtime, since registering spawns the worker.
pub struct ChannelReceiverRegistry {
    capacity: usize,
    receivers: RwLock<HashMap<String, ReceiverChannel>>,
    // Channels replaced by a later registration, closed along with the rest
    retired: Mutex<Vec<(String, ReceiverChannel)>>,
}

impl ChannelReceiverRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            receivers: RwLock::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Names of all registered receivers
    pub fn names(&self) -> Vec<String> {
        let receivers = self.receivers.read().unwrap_or_else(PoisonError::into_inner);
        receivers.keys().cloned().collect()
    }
}

impl Default for ChannelReceiverRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

#[async_trait]
impl ReceiverRegistry for ChannelReceiverRegistry {
    fn register(&self, name: &str, sink: Arc<dyn Sink>) {
        let (sender, mut rx) = mpsc::channel::<Arc<EnhancedEvent>>(self.capacity);
        let worker_sink = Arc::clone(&sink);
        let receiver = name.to_string();

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = worker_sink.send(&event).await {
                    tracing::warn!(
                        receiver = %receiver,
                        reason = %event.event.reason,
                        error = %e,
                        "Failed to deliver event"
                    );
                }
            }
        });

        let previous = self
            .receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), ReceiverChannel { sender, worker, sink });

        if let Some(previous) = previous {
            tracing::warn!(receiver = %name, "Receiver registered twice, replacing sink");
            self.retired
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((name.to_string(), previous));
        }
    }

    fn send_event(&self, name: &str, event: &EnhancedEvent) {
        let receivers = self.receivers.read().unwrap_or_else(PoisonError::into_inner);
        let Some(channel) = receivers.get(name) else {
            tracing::warn!(receiver = %name, "Event routed to unknown receiver");
            return;
        };

        match channel.sender.try_send(Arc::new(event.clone())) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    receiver = %name,
                    capacity = self.capacity,
                    "Receiver queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(receiver = %name, "Receiver closed, dropping event");
            }
        }
    }

    async fn close(&self) {
        let mut channels: Vec<(String, ReceiverChannel)> = self
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        channels.extend(
            self.receivers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(),
        );

        let mut workers = Vec::with_capacity(channels.len());
        let mut sinks = Vec::with_capacity(channels.len());
        for (name, channel) in channels {
            // Dropping the sender lets the worker finish what is queued
            drop(channel.sender);
            workers.push(channel.worker);
            sinks.push((name, channel.sink));
        }

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Receiver worker terminated abnormally");
            }
        }

        for (name, sink) in sinks {
            sink.close().await;
            tracing::debug!(receiver = %name, kind = sink.kind(), "Sink closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExporterError, Result};
    use crate::sink::MemorySink;
    use crate::types::Event;

    fn event(reason: &str) -> EnhancedEvent {
        EnhancedEvent::new(&Event {
            reason: reason.to_string(),
            ..Default::default()
        })
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        async fn send(&self, _event: &EnhancedEvent) -> Result<()> {
            Err(ExporterError::Sink {
                receiver: "broken".to_string(),
                reason: "connection refused".to_string(),
            })
        }

        fn kind(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_send_and_close_delivers_queued_events() {
        let registry = ChannelReceiverRegistry::default();
        let sink = MemorySink::new();
        registry.register("dump", Arc::new(sink.clone()));

        registry.send_event("dump", &event("Failed"));
        registry.send_event("dump", &event("BackOff"));
        registry.close().await;

        let events = sink.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.reason, "Failed");
        assert_eq!(events[1].event.reason, "BackOff");
        assert!(sink.is_closed());
        assert!(registry.names().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_receiver_is_ignored() {
        let registry = ChannelReceiverRegistry::default();
        let sink = MemorySink::new();
        registry.register("dump", Arc::new(sink.clone()));

        registry.send_event("missing", &event("Failed"));
        registry.close().await;

        assert!(sink.is_empty().await);
    }

    #[tokio::test]
    async fn test_receivers_are_isolated() {
        let registry = ChannelReceiverRegistry::default();
        let healthy = MemorySink::new();
        registry.register("broken", Arc::new(FailingSink));
        registry.register("healthy", Arc::new(healthy.clone()));

        registry.send_event("broken", &event("Failed"));
        registry.send_event("healthy", &event("Failed"));
        registry.close().await;

        assert_eq!(healthy.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_replaces_sink() {
        let registry = ChannelReceiverRegistry::default();
        let old = MemorySink::new();
        let new = MemorySink::new();
        registry.register("dump", Arc::new(old.clone()));
        registry.register("dump", Arc::new(new.clone()));

        registry.send_event("dump", &event("Failed"));
        registry.close().await;

        assert!(old.is_empty().await);
        assert!(old.is_closed());
        assert_eq!(new.len().await, 1);
        assert!(new.is_closed());
        assert_eq!(registry.names().len(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_instead_of_blocking() {
        let registry = ChannelReceiverRegistry::new(2);
        let sink = MemorySink::new();
        registry.register("dump", Arc::new(sink.clone()));

        // The worker cannot run until this task yields, so the queue fills
        for _ in 0..5 {
            registry.send_event("dump", &event("Failed"));
        }
        registry.close().await;

        assert_eq!(sink.len().await, 2);
    }
}
