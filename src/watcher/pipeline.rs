//! Per-notification handling: staleness, pre-check, enrichment, hand-off

use crate::metadata::MetadataLookup;
use crate::types::{EnhancedEvent, Event};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with every fully enriched event
pub type EventHandler = Arc<dyn Fn(&EnhancedEvent) + Send + Sync>;

/// Cheap callback deciding whether an event is worth enriching
pub type EventChecker = Arc<dyn Fn(&EnhancedEvent) -> bool + Send + Sync>;

/// Default age after which a notification is considered replayed history
pub const DEFAULT_MAX_EVENT_AGE: Duration = Duration::from_secs(5);

/// The three callback slots a notification source dispatches into
///
/// Implementations must accept calls from several tasks at once.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn on_add(&self, event: &Event);
    async fn on_update(&self, old: &Event, new: &Event);
    async fn on_delete(&self, event: &Event);
}

/// Whether an event was last seen more than `max_age` before `now`
///
/// Events carrying no timestamp at all are treated as stale.
pub fn is_stale(event: &Event, now: DateTime<Utc>, max_age: Duration) -> bool {
    let Some(last_seen) = event.last_seen() else {
        return true;
    };
    match (now - last_seen).to_std() {
        Ok(age) => age > max_age,
        // Timestamp in the future: clock skew, not history
        Err(_) => false,
    }
}

/// Filters, enriches and forwards individual notifications
pub struct EventPipeline {
    max_event_age: Duration,
    namespace: Option<String>,
    labels: Arc<dyn MetadataLookup>,
    annotations: Arc<dyn MetadataLookup>,
    handler: EventHandler,
    checker: EventChecker,
}

impl EventPipeline {
    pub fn new(
        labels: Arc<dyn MetadataLookup>,
        annotations: Arc<dyn MetadataLookup>,
        handler: EventHandler,
        checker: EventChecker,
    ) -> Self {
        Self {
            max_event_age: DEFAULT_MAX_EVENT_AGE,
            namespace: None,
            labels,
            annotations,
            handler,
            checker,
        }
    }

    pub fn with_max_event_age(mut self, max_event_age: Duration) -> Self {
        self.max_event_age = max_event_age;
        self
    }

    /// Only handle events recorded in this namespace
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    /// Run one notification through the pipeline
    ///
    /// Returns whether the handler was invoked.
    pub async fn handle(&self, event: &Event) -> bool {
        if let Some(namespace) = &self.namespace {
            if event.namespace() != namespace {
                tracing::trace!(namespace = %event.namespace(), "Ignoring event outside watched namespace");
                return false;
            }
        }

        if is_stale(event, Utc::now(), self.max_event_age) {
            tracing::trace!(
                reason = %event.reason,
                involved_object = %event.involved_object.name,
                "Ignoring stale event"
            );
            return false;
        }

        tracing::debug!(
            msg = %event.message,
            namespace = %event.namespace(),
            reason = %event.reason,
            involved_object = %event.involved_object.name,
            "Received event"
        );

        let mut enhanced = EnhancedEvent::new(event);

        // Lookups run only for events some rule can use
        if !(self.checker)(&enhanced) {
            tracing::debug!(
                namespace = %event.namespace(),
                reason = %event.reason,
                involved_object = %event.involved_object.name,
                "No rules matched, stopped processing"
            );
            return false;
        }

        let reference = &enhanced.involved_object.reference;
        match self.labels.lookup(reference).await {
            Ok(labels) => enhanced.involved_object.labels = Some(labels),
            Err(e) => {
                tracing::error!(object = %reference, error = %e, "Cannot list labels of the object")
            }
        }

        let reference = &enhanced.involved_object.reference;
        match self.annotations.lookup(reference).await {
            Ok(annotations) => enhanced.involved_object.annotations = Some(annotations),
            Err(e) => {
                tracing::error!(object = %reference, error = %e, "Cannot list annotations of the object")
            }
        }

        (self.handler)(&enhanced);
        true
    }
}

#[async_trait]
impl NotificationHandler for EventPipeline {
    async fn on_add(&self, event: &Event) {
        self.handle(event).await;
    }

    async fn on_update(&self, _old: &Event, new: &Event) {
        self.handle(new).await;
    }

    async fn on_delete(&self, _event: &Event) {}
}
