//! In-memory sink for embedding and testing
//!
//! Keeps every delivered event in a `Vec`; lost on drop.

use super::Sink;
use crate::error::Result;
use crate::types::EnhancedEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sink that records delivered events
///
/// Clones share the same storage, so a test can keep one handle and
/// register the other.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<RwLock<Vec<EnhancedEvent>>>,
    closed: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered so far, oldest first
    pub async fn events(&self) -> Vec<EnhancedEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn send(&self, event: &EnhancedEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn kind(&self) -> &str {
        "memory"
    }
}
