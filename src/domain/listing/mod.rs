//! Listing module - sale and VIP state of marketplace posts.

mod aggregate;
mod ranking;

pub use aggregate::{Listing, ListingCategory, SaleStatus, VerifyStatus, VipGrant, VipTier};
pub use ranking::rank_listings;
