//! ListPublicListingsHandler - Query handler for the public listing feed.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, ListingId, Timestamp, UserId};
use crate::domain::listing::{rank_listings, Listing, ListingCategory, VipTier};
use crate::ports::ListingRepository;

/// A listing as shown publicly, with VIP state resolved against the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicListing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub title: String,
    pub category: ListingCategory,
    pub price: i64,
    pub published_at: Option<Timestamp>,
    pub is_vip: bool,
    pub vip_tier: Option<VipTier>,
    pub vip_priority: i32,
    pub vip_expires_at: Option<Timestamp>,
}

impl PublicListing {
    fn project(listing: Listing, now: Timestamp) -> Self {
        let effective = listing.is_vip_effective(now);
        Self {
            id: listing.id,
            owner_id: listing.owner_id,
            vip_priority: listing.effective_priority(now),
            title: listing.title,
            category: listing.category,
            price: listing.price,
            published_at: listing.published_at,
            is_vip: effective,
            vip_tier: if effective { listing.vip_tier } else { None },
            vip_expires_at: if effective { listing.vip_expires_at } else { None },
        }
    }
}

pub struct ListPublicListingsHandler {
    listings: Arc<dyn ListingRepository>,
}

impl ListPublicListingsHandler {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self { listings }
    }

    pub async fn handle(&self) -> Result<Vec<PublicListing>, DomainError> {
        let now = Timestamp::now();
        let listings = self.listings.list_public().await?;
        Ok(rank_listings(listings, now)
            .into_iter()
            .map(|l| PublicListing::project(l, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        listing_id, plan_id, Fixture, BATTERY, DRAFT_VEHICLE, GOLD_30_DAYS, SECOND_VEHICLE,
        VEHICLE,
    };
    use crate::domain::listing::VipGrant;

    fn set_vip(fixture: &Fixture, id: i64, priority: i32, expires_at: Timestamp) {
        let mut listing = fixture.store.listing(listing_id(id)).unwrap();
        let published_at = listing.published_at;
        listing.activate_vip(
            VipGrant {
                tier: Some(VipTier::Gold),
                priority,
                expires_at,
                plan_id: plan_id(GOLD_30_DAYS),
            },
            Timestamp::now(),
        );
        listing.published_at = published_at;
        fixture.store.add_listing(listing);
    }

    #[tokio::test]
    async fn effective_vip_comes_first_and_unpublished_drafts_are_hidden() {
        let fixture = Fixture::new();
        set_vip(&fixture, SECOND_VEHICLE, 20, Timestamp::now().add_days(5));

        let feed = ListPublicListingsHandler::new(fixture.store.clone())
            .handle()
            .await
            .unwrap();

        let ids: Vec<ListingId> = feed.iter().map(|l| l.id).collect();
        assert_eq!(
            ids,
            vec![listing_id(SECOND_VEHICLE), listing_id(VEHICLE), listing_id(BATTERY)]
        );
        assert!(!ids.contains(&listing_id(DRAFT_VEHICLE)));
        assert!(feed[0].is_vip);
        assert_eq!(feed[0].vip_priority, 20);
    }

    #[tokio::test]
    async fn lapsed_vip_is_shown_as_plain_listing() {
        let fixture = Fixture::new();
        set_vip(&fixture, SECOND_VEHICLE, 50, Timestamp::now().add_days(-1));

        let feed = ListPublicListingsHandler::new(fixture.store.clone())
            .handle()
            .await
            .unwrap();

        let lapsed = feed.iter().find(|l| l.id == listing_id(SECOND_VEHICLE)).unwrap();
        assert!(!lapsed.is_vip);
        assert_eq!(lapsed.vip_tier, None);
        assert_eq!(lapsed.vip_priority, 0);
        assert_eq!(lapsed.vip_expires_at, None);
    }
}
