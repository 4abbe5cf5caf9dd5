//! Engine: composition root of the routing core
//!
//! Owns the root route and the receiver registry, builds every configured
//! sink at construction, and exposes the two callbacks the watcher calls
//! into: [`Engine::on_check`] before enrichment and [`Engine::on_event`]
//! after it.

use crate::config::Config;
use crate::error::Result;
use crate::registry::ReceiverRegistry;
use crate::route::Route;
use crate::types::EnhancedEvent;
use crate::watcher::{EventChecker, EventHandler};
use std::sync::Arc;

/// Routes enriched events to the receivers their rules select
pub struct Engine {
    route: Route,
    registry: Arc<dyn ReceiverRegistry>,
}

impl Engine {
    /// Build every configured sink and register it under its receiver name
    ///
    /// The first sink that fails to build aborts construction. Sinks
    /// registered before the failure stay in `registry`; the caller owns
    /// closing it.
    pub fn new(config: &Config, registry: Arc<dyn ReceiverRegistry>) -> Result<Self> {
        for receiver in &config.receivers {
            let sink = receiver.build_sink().map_err(|e| {
                tracing::error!(name = %receiver.name, error = %e, "Cannot initialize sink");
                e
            })?;

            tracing::info!(name = %receiver.name, kind = sink.kind(), "Registering sink");
            registry.register(&receiver.name, sink);
        }

        Ok(Self::with_route(config.route.clone(), registry))
    }

    /// Engine over an already populated registry
    pub fn with_route(route: Route, registry: Arc<dyn ReceiverRegistry>) -> Self {
        Self { route, registry }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Dispatch an event through the whole routing tree
    ///
    /// Performs no filtering of its own; `on_check` has already run.
    pub fn on_event(&self, event: &EnhancedEvent) {
        self.route.process_event(event, self.registry.as_ref());
    }

    /// Whether the event is worth enriching and processing at all
    ///
    /// Looks only at the root route and its direct children. Receivers bound
    /// deeper in the tree do not make this return `true`.
    pub fn on_check(&self, event: &EnhancedEvent) -> bool {
        for route in std::iter::once(&self.route).chain(&self.route.routes) {
            let result = route.find_matched_rules(event);
            if !result.passes() {
                return false;
            }
            if result.has_receivers() {
                return true;
            }
        }
        false
    }

    /// Close every registered sink
    pub async fn stop(&self) {
        tracing::info!("Closing sinks");
        self.registry.close().await;
        tracing::info!("All sinks closed");
    }

    /// `on_event` as a watcher handler
    pub fn handler(self: &Arc<Self>) -> EventHandler {
        let engine = Arc::clone(self);
        Arc::new(move |event: &EnhancedEvent| engine.on_event(event))
    }

    /// `on_check` as a watcher checker
    pub fn checker(self: &Arc<Self>) -> EventChecker {
        let engine = Arc::clone(self);
        Arc::new(move |event: &EnhancedEvent| engine.on_check(event))
    }
}
