//! # a3s-event-exporter
//!
//! Watches a stream of cluster lifecycle events and routes each one to the
//! receivers whose rules select it.
//!
//! ## Overview
//!
//! Events flow through a small pipeline:
//!
//! ```text
//! EventSource ──► Watcher ──► staleness ──► Engine::on_check ──► label/annotation lookup
//!                                                                     │
//!        ReceiverRegistry::send_event ◄── Route::process_event ◄── Engine::on_event
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a3s_event_exporter::{
//!     ChannelEventSource, ChannelReceiverRegistry, Config, Engine, KubectlFetcher,
//!     MetadataCache, Watcher,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> a3s_event_exporter::Result<()> {
//! let config = Config::from_yaml(r#"
//! route:
//!   match:
//!     - reason: Failed
//!       receiver: dump
//! receivers:
//!   - name: dump
//!     stdout: {}
//! "#)?;
//!
//! let registry = Arc::new(ChannelReceiverRegistry::new(config.receiver_buffer_size));
//! let engine = Arc::new(Engine::new(&config, registry)?);
//!
//! let fetcher = Arc::new(KubectlFetcher::new());
//! let (_tx, source) = ChannelEventSource::new(128);
//! let watcher = Watcher::new(
//!     Box::new(source),
//!     config.watcher_config(),
//!     Arc::new(MetadataCache::labels(fetcher.clone())),
//!     Arc::new(MetadataCache::annotations(fetcher)),
//!     engine.handler(),
//!     engine.checker(),
//! );
//!
//! watcher.start().await?;
//! // ...
//! watcher.stop().await;
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Rule**: regex predicate over event fields, optionally bound to a receiver
//! - **Route**: drop rules, match rules and child routes; pure recursive evaluation
//! - **Engine**: root route + receiver registry; `on_check` / `on_event` callbacks
//! - **Watcher**: background loop over an `EventSource`, enriching events via `MetadataLookup`
//! - **ReceiverRegistry** / **Sink**: fire-and-forget delivery to named outputs

pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod route;
pub mod rule;
pub mod sink;
pub mod types;
pub mod watcher;

// Re-export core types
pub use config::{Config, LogFormat};
pub use engine::Engine;
pub use error::{ExporterError, Result};
pub use metadata::{
    KubectlFetcher, MemoryObjectFetcher, MetadataCache, MetadataField, MetadataLookup,
    ObjectFetcher, ObjectMetadata,
};
pub use registry::{ChannelReceiverRegistry, ReceiverRegistry};
pub use route::{MatchResult, Route};
pub use rule::{Pattern, Rule};
pub use sink::{FileSink, MemorySink, ReceiverConfig, Sink, StdoutSink};
pub use types::{EnhancedEvent, EnhancedObjectReference, Event, ObjectReference};
pub use watcher::{
    ChannelEventSource, EventChecker, EventHandler, EventPipeline, EventSource,
    LinesEventSource, Notification, NotificationHandler, Watcher, WatcherConfig, WatcherState,
};
