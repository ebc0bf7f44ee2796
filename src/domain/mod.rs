//! Domain layer - marketplace business logic.
//!
//! - `foundation` - identifiers, timestamps, errors, events, actors
//! - `contract` - sale contracts, signing codes, purchase requests
//! - `listing` - listing sale and VIP state, public ranking
//! - `vip` - VIP plans and the purchase ledger

pub mod contract;
pub mod foundation;
pub mod listing;
pub mod vip;
