//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations, grouped
//! by module.

pub mod contract;
pub mod listing;
pub mod purchase_request;
pub mod vip;

#[cfg(test)]
pub(crate) mod test_support;
