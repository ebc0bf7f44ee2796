//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the actor model, error types and
//! event infrastructure that form the vocabulary of the marketplace domain.

mod auth;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{Actor, AuthError, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{ContractId, ListingId, PurchaseRequestId, UserId, VipPlanId, VipPurchaseId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
