//! ListingSaleStatusSync - Event handler for `contract.signed`.
//!
//! Marks the contract's listing sold once both parties have signed. Runs
//! after the contract is committed; a failure here leaves the contract
//! signed and is only logged by the bus.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::contract::ContractSigned;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, Timestamp};
use crate::ports::{EventHandler, ListingRepository};

pub struct ListingSaleStatusSync {
    listings: Arc<dyn ListingRepository>,
}

impl ListingSaleStatusSync {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl EventHandler for ListingSaleStatusSync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let signed: ContractSigned = event
            .payload_as()
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;

        let mut listing = self
            .listings
            .find_by_id(signed.listing_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ListingNotFound,
                    format!("Listing not found: {}", signed.listing_id),
                )
            })?;

        // Redelivery finds it already sold
        if !listing.mark_sold(Timestamp::now()) {
            return Ok(());
        }
        self.listings.update(&listing).await?;

        tracing::info!(
            listing_id = %listing.id,
            contract_id = %signed.contract_id,
            "Listing marked sold"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ListingSaleStatusSync"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        listing_id, user, Fixture, BUYER, SELLER, VEHICLE,
    };
    use crate::domain::contract::CONTRACT_SIGNED_EVENT;
    use crate::domain::foundation::{ContractId, EventId};
    use crate::ports::{EventPublisher, EventSubscriber};

    fn signed_on(listing: i64) -> EventEnvelope {
        EventEnvelope::from_event(&ContractSigned {
            event_id: EventId::new(),
            contract_id: ContractId::new(),
            listing_id: listing_id(listing),
            buyer_id: user(BUYER),
            seller_id: user(SELLER),
            signed_at: Timestamp::now(),
        })
    }

    #[tokio::test]
    async fn signed_contract_marks_listing_sold_via_bus() {
        let fixture = Fixture::new();
        fixture.bus.subscribe(
            CONTRACT_SIGNED_EVENT,
            Arc::new(ListingSaleStatusSync::new(fixture.store.clone())),
        );

        fixture.bus.publish(signed_on(VEHICLE)).await.unwrap();

        assert!(fixture.store.listing(listing_id(VEHICLE)).unwrap().is_sold());
    }

    #[tokio::test]
    async fn redelivery_is_harmless() {
        let fixture = Fixture::new();
        let sync = ListingSaleStatusSync::new(fixture.store.clone());

        sync.handle(signed_on(VEHICLE)).await.unwrap();
        sync.handle(signed_on(VEHICLE)).await.unwrap();

        assert!(fixture.store.listing(listing_id(VEHICLE)).unwrap().is_sold());
    }

    #[tokio::test]
    async fn unknown_listing_is_an_error() {
        let fixture = Fixture::new();
        let err = ListingSaleStatusSync::new(fixture.store.clone())
            .handle(signed_on(404))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ListingNotFound);
    }
}
