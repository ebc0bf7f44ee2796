//! CreatePurchaseRequestHandler - a buyer asks to purchase a listing.

use std::sync::Arc;

use crate::application::handlers::contract::guards::{ensure_listing_purchasable, load_listing};
use crate::application::handlers::contract::{purchase_request_received, ContractMailer};
use crate::domain::contract::{ContractError, PurchaseRequest, DEFAULT_REQUEST_TTL_DAYS};
use crate::domain::foundation::{
    Actor, ErrorCode, ListingId, PurchaseRequestId, Role, Timestamp,
};
use crate::ports::{ListingRepository, PurchaseRequestRepository};

use super::loading::expire_and_persist;

#[derive(Debug, Clone)]
pub struct CreatePurchaseRequestCommand {
    pub actor: Actor,
    pub listing_id: ListingId,
    pub message: Option<String>,
}

/// Customers only. One pending request per buyer and listing.
pub struct CreatePurchaseRequestHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
    listings: Arc<dyn ListingRepository>,
    mailer: Arc<ContractMailer>,
    ttl_days: i64,
}

impl CreatePurchaseRequestHandler {
    pub fn new(
        requests: Arc<dyn PurchaseRequestRepository>,
        listings: Arc<dyn ListingRepository>,
        mailer: Arc<ContractMailer>,
    ) -> Self {
        Self {
            requests,
            listings,
            mailer,
            ttl_days: DEFAULT_REQUEST_TTL_DAYS,
        }
    }

    pub fn with_ttl_days(mut self, ttl_days: i64) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub async fn handle(
        &self,
        cmd: CreatePurchaseRequestCommand,
    ) -> Result<PurchaseRequest, ContractError> {
        if cmd.actor.role != Role::Customer {
            return Err(ContractError::forbidden("Only customers may request to buy a listing"));
        }
        let buyer_id = cmd.actor.id;
        let now = Timestamp::now();

        // 1. Listing checks
        let listing = load_listing(self.listings.as_ref(), cmd.listing_id).await?;
        ensure_listing_purchasable(&listing, buyer_id)?;

        // 2. An overdue pending request no longer blocks a new one
        if let Some(mut existing) = self.requests.find_pending_for(buyer_id, listing.id).await? {
            if !expire_and_persist(self.requests.as_ref(), &mut existing, now).await? {
                return Err(ContractError::conflict(
                    ErrorCode::PurchaseRequestExists,
                    "You already have a pending request for this listing",
                ));
            }
        }

        // 3. Create and persist
        let request = PurchaseRequest::new(
            PurchaseRequestId::new(),
            buyer_id,
            listing.owner_id,
            listing.id,
            cmd.message,
            self.ttl_days,
            now,
        )?;
        self.requests.save(&request).await?;

        tracing::info!(
            request_id = %request.id(),
            listing_id = %listing.id,
            buyer_id = %buyer_id,
            "Purchase request created"
        );

        // 4. Tell the seller
        let (subject, body) = purchase_request_received(&request);
        self.mailer.send_to(request.seller_id(), &subject, body).await;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        buyer, email_of, listing_id, seller, staff, Fixture, BATTERY, SELLER, VEHICLE,
    };
    use crate::domain::contract::PurchaseRequestStatus;

    fn handler(fixture: &Fixture) -> CreatePurchaseRequestHandler {
        CreatePurchaseRequestHandler::new(fixture.store.clone(), fixture.store.clone(), fixture.mailer())
    }

    fn command(actor: Actor, listing: i64) -> CreatePurchaseRequestCommand {
        CreatePurchaseRequestCommand {
            actor,
            listing_id: listing_id(listing),
            message: Some("Is the battery warranty transferable?".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_pending_request_due_in_three_days() {
        let fixture = Fixture::new();
        let request = handler(&fixture).handle(command(buyer(), VEHICLE)).await.unwrap();

        assert_eq!(request.status(), PurchaseRequestStatus::Pending);
        assert_eq!(request.seller_id().as_i64(), SELLER);
        assert_eq!(request.expires_at(), request.created_at().add_days(3));
        assert_eq!(fixture.notifier.sent_to(&email_of(SELLER)).len(), 1);
    }

    #[tokio::test]
    async fn duplicate_pending_request_conflicts() {
        let fixture = Fixture::new();
        let handler = handler(&fixture);
        handler.handle(command(buyer(), VEHICLE)).await.unwrap();

        let err = handler.handle(command(buyer(), VEHICLE)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PurchaseRequestExists);
    }

    #[tokio::test]
    async fn overdue_request_is_expired_and_replaced() {
        let fixture = Fixture::new();
        let old = fixture.request_aged(4).await;

        let fresh = handler(&fixture).handle(command(buyer(), VEHICLE)).await.unwrap();

        assert_ne!(fresh.id(), old.id());
        let stored = fixture.stored_request(old.id()).await;
        assert_eq!(stored.status(), PurchaseRequestStatus::Expired);
    }

    #[tokio::test]
    async fn battery_and_own_listings_are_refused() {
        let fixture = Fixture::new();
        assert!(handler(&fixture).handle(command(buyer(), BATTERY)).await.is_err());

        let err = handler(&fixture).handle(command(seller(), VEHICLE)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn staff_cannot_request() {
        let fixture = Fixture::new();
        let err = handler(&fixture).handle(command(staff(), VEHICLE)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
