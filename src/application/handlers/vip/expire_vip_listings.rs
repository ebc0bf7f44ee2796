//! ExpireVipListingsHandler - clears VIP state whose paid period has ended.

use std::sync::Arc;

use crate::domain::foundation::{EventEnvelope, EventId, Timestamp};
use crate::domain::vip::{VipDeactivated, VipEndReason, VipError};
use crate::ports::{EventPublisher, ListingRepository};

pub struct ExpireVipListingsHandler {
    listings: Arc<dyn ListingRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ExpireVipListingsHandler {
    pub fn new(listings: Arc<dyn ListingRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            listings,
            publisher,
        }
    }

    /// Returns the number of listings taken down.
    pub async fn handle(&self, now: Timestamp) -> Result<usize, VipError> {
        let lapsed = self.listings.find_lapsed_vip(now).await?;
        let mut expired = 0;

        for mut listing in lapsed {
            if !listing.expire_vip_if_lapsed(now) {
                continue;
            }
            if let Err(e) = self.listings.update(&listing).await {
                tracing::warn!(listing_id = %listing.id, error = %e, "Failed to expire VIP listing");
                continue;
            }
            expired += 1;

            let event = VipDeactivated {
                event_id: EventId::new(),
                listing_id: listing.id,
                reason: VipEndReason::Expired,
                deactivated_at: now,
            };
            let envelope = EventEnvelope::from_event(&event).with_user_id(listing.owner_id.to_string());
            if let Err(e) = self.publisher.publish(envelope).await {
                tracing::warn!(listing_id = %listing.id, error = %e, "Failed to publish vip.deactivated");
            }
        }

        if expired > 0 {
            tracing::info!(expired, "VIP expiry sweep finished");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        listing_id, plan_id, Fixture, DRAFT_VEHICLE, GOLD_30_DAYS, VEHICLE,
    };
    use crate::domain::listing::{VipGrant, VipTier};

    fn promote(fixture: &Fixture, listing: i64, activated_at: Timestamp, days: i64) {
        let mut l = fixture.store.listing(listing_id(listing)).unwrap();
        l.activate_vip(
            VipGrant {
                tier: Some(VipTier::Gold),
                priority: 20,
                expires_at: activated_at.add_days(days),
                plan_id: plan_id(GOLD_30_DAYS),
            },
            activated_at,
        );
        fixture.store.add_listing(l);
    }

    #[tokio::test]
    async fn lapsed_vip_is_cleared_and_unpublished() {
        let fixture = Fixture::new();
        let now = Timestamp::now();
        promote(&fixture, DRAFT_VEHICLE, now.add_days(-31), 30);
        promote(&fixture, VEHICLE, now, 30);
        let handler = ExpireVipListingsHandler::new(fixture.store.clone(), fixture.bus.clone());

        assert_eq!(handler.handle(now).await.unwrap(), 1);

        let lapsed = fixture.store.listing(listing_id(DRAFT_VEHICLE)).unwrap();
        assert!(!lapsed.is_vip);
        assert!(!lapsed.is_active);
        assert_eq!(lapsed.vip_tier, None);
        assert_eq!(lapsed.vip_priority, 0);
        assert!(fixture.store.listing(listing_id(VEHICLE)).unwrap().is_vip);
        assert_eq!(fixture.bus.events_of_type("vip.deactivated").len(), 1);

        assert_eq!(handler.handle(now).await.unwrap(), 0);
    }
}
