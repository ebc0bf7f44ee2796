//! EventSubscriber port - Interface for subscribing to domain events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations must be idempotent: the same event may arrive twice.
///
/// ```ignore
/// #[async_trait]
/// impl EventHandler for ListingSaleStatusSync {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let signed: ContractSigned = event.payload_as()?;
///         // mark the listing sold...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "ListingSaleStatusSync"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// An event bus both publishes and dispatches to subscribers.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
