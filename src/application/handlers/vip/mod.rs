//! VIP handlers.
//!
//! Paid listing promotion:
//!
//! ## Commands
//! - Hosted checkout for a plan
//! - Gateway webhook reconciliation
//! - Expiry sweep
//!
//! ## Queries
//! - Active plan catalogue

mod create_vip_checkout;
mod expire_vip_listings;
mod handle_vip_webhook;
mod list_vip_plans;
mod settings;

pub use create_vip_checkout::{
    CreateVipCheckoutCommand, CreateVipCheckoutHandler, CreateVipCheckoutResult,
    VIP_PURCHASE_TYPE,
};
pub use expire_vip_listings::ExpireVipListingsHandler;
pub use handle_vip_webhook::{HandleVipWebhookHandler, WebhookOutcome};
pub use list_vip_plans::ListVipPlansHandler;
pub use settings::VipSettings;
