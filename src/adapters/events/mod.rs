//! Event bus adapters.
//!
//! - `InMemoryEventBus` - in-process dispatch to post-commit handlers

mod in_memory;

pub use in_memory::InMemoryEventBus;
