//! Listing handlers.
//!
//! - Public feed ordered by effective VIP priority
//! - Sale status sync on signed contracts

mod list_public_listings;
mod listing_sale_status_sync;

pub use list_public_listings::{ListPublicListingsHandler, PublicListing};
pub use listing_sale_status_sync::ListingSaleStatusSync;
