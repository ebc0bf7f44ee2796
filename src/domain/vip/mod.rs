//! VIP module - paid listing promotion.
//!
//! - `plan` - VIP plan catalogue and billing periods
//! - `purchase` - Purchase ledger rows and order codes
//! - `events` - Activation and deactivation events
//! - `errors` - Module error type

mod errors;
mod events;
mod plan;
mod purchase;

pub use errors::VipError;
pub use events::{VipActivated, VipDeactivated, VipEndReason};
pub use plan::{BillingInterval, PlanBilling, VipPlan};
pub use purchase::{OrderCode, PurchaseStatus, VipPurchase, PROVIDER_STRIPE};
