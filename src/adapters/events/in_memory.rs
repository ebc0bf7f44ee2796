//! In-process event bus.
//!
//! Delivers each published envelope to the handlers subscribed to its type,
//! in subscription order, on the publishing task. Handlers therefore run
//! after the publisher's own write has committed.
//!
//! Tests keep a history of published events for assertions; the server
//! builds the bus with `without_history()`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-process event bus.
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe(CONTRACT_SIGNED_EVENT, Arc::new(sync));
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("contract.signed"));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
    keep_history: bool,
}

impl InMemoryEventBus {
    /// Creates a bus that records every published event.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: RwLock::new(Vec::new()),
            keep_history: true,
        }
    }

    /// Creates a bus that only dispatches.
    pub fn without_history() -> Self {
        Self {
            keep_history: false,
            ..Self::new()
        }
    }

    // === Test Helpers ===

    /// Returns all recorded events.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns recorded events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns recorded events for a specific aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.keep_history {
            self.published
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        }

        // Clone handlers so no lock is held across an await
        let type_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&event.event_type)
                .cloned()
                .unwrap_or_default()
        };

        let mut errors = Vec::new();
        for handler in type_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    error = %e,
                    "Event handler failed"
                );
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            ));
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "Test", json!({}))
    }

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::database("listing table locked"))
        }

        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    #[tokio::test]
    async fn publish_records_event() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("contract.signed", "c-1")).await.unwrap();
        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("contract.signed"));
    }

    #[tokio::test]
    async fn without_history_still_dispatches() {
        let bus = InMemoryEventBus::without_history();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("contract.signed", handler.clone());

        bus.publish(envelope("contract.signed", "c-1")).await.unwrap();

        assert_eq!(bus.event_count(), 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handlers_only_see_subscribed_types() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe_all(&["vip.activated", "vip.deactivated"], handler.clone());

        bus.publish(envelope("vip.activated", "1")).await.unwrap();
        bus.publish(envelope("contract.signed", "2")).await.unwrap();
        bus.publish(envelope("vip.deactivated", "1")).await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bus.events_for_aggregate("1").len(), 2);
    }

    #[tokio::test]
    async fn handler_failure_is_reported_after_all_handlers_run() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("contract.signed", Arc::new(FailingHandler));
        bus.subscribe("contract.signed", counter.clone());

        let err = bus
            .publish(envelope("contract.signed", "c-1"))
            .await
            .unwrap_err();

        assert!(err.message.contains("FailingHandler"));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_drops_history() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("a", "1")).await.unwrap();
        bus.clear();
        assert_eq!(bus.event_count(), 0);
        assert!(bus.events_of_type("a").is_empty());
    }
}
