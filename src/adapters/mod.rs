//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Repositories over sqlx/PostgreSQL
//! - `memory` - In-memory store for tests and local runs
//! - `stripe` - Payment gateway (hosted checkout, webhooks)
//! - `email` - Resend notifier and test doubles
//! - `auth` - Bearer token verification
//! - `events` - In-process event bus
//! - `http` - axum REST API

pub mod auth;
pub mod email;
pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use events::InMemoryEventBus;
pub use memory::InMemoryMarketplaceStore;
