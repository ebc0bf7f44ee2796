//! In-memory repository adapters for tests and local runs.

mod marketplace_store;

pub use marketplace_store::InMemoryMarketplaceStore;
