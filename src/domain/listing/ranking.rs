//! Public listing order.

use crate::domain::foundation::Timestamp;

use super::Listing;

/// Filters to public listings and orders them for display.
///
/// Effective VIP priority first (lapsed VIPs count as zero), then most
/// recently published. Unpublished listings sort last within a priority.
pub fn rank_listings(listings: Vec<Listing>, now: Timestamp) -> Vec<Listing> {
    let mut public: Vec<Listing> = listings.into_iter().filter(Listing::is_public).collect();
    public.sort_by(|a, b| {
        b.effective_priority(now)
            .cmp(&a.effective_priority(now))
            .then_with(|| b.published_at.cmp(&a.published_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    public
}
