//! CreateContractHandler - Command handler for a buyer opening a contract directly.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractCreated, ContractError};
use crate::domain::foundation::{
    Actor, ContractId, EventEnvelope, EventId, ListingId, Timestamp,
};
use crate::ports::{ContractRepository, EventPublisher, ListingRepository};

use super::guards::{ensure_listing_purchasable, ensure_no_active_contract, load_listing};
use super::notifications::{contract_opened, ContractMailer};

/// Command to open a contract on a listing.
#[derive(Debug, Clone)]
pub struct CreateContractCommand {
    pub actor: Actor,
    pub listing_id: ListingId,
}

/// Result of contract creation.
#[derive(Debug, Clone)]
pub struct CreateContractResult {
    pub contract: Contract,
    pub event: ContractCreated,
}

/// Handler for direct contract requests.
///
/// The actor becomes the buyer and the listing owner the seller.
pub struct CreateContractHandler {
    contracts: Arc<dyn ContractRepository>,
    listings: Arc<dyn ListingRepository>,
    publisher: Arc<dyn EventPublisher>,
    mailer: Arc<ContractMailer>,
}

impl CreateContractHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        listings: Arc<dyn ListingRepository>,
        publisher: Arc<dyn EventPublisher>,
        mailer: Arc<ContractMailer>,
    ) -> Self {
        Self {
            contracts,
            listings,
            publisher,
            mailer,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateContractCommand,
    ) -> Result<CreateContractResult, ContractError> {
        let buyer_id = cmd.actor.id;

        // 1. Load the listing and check it can be bought
        let listing = load_listing(self.listings.as_ref(), cmd.listing_id).await?;
        ensure_listing_purchasable(&listing, buyer_id)?;

        // 2. One open contract per buyer and listing
        ensure_no_active_contract(self.contracts.as_ref(), buyer_id, listing.id).await?;

        // 3. Create and persist
        let now = Timestamp::now();
        let contract = Contract::create(
            ContractId::new(),
            listing.id,
            buyer_id,
            listing.owner_id,
            None,
            now,
        )?;
        self.contracts.save(&contract).await?;

        tracing::info!(
            contract_id = %contract.id(),
            listing_id = %listing.id,
            buyer_id = %buyer_id,
            "Contract opened"
        );

        // 4. Post-commit: event and emails
        let event = ContractCreated {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            listing_id: listing.id,
            buyer_id,
            seller_id: listing.owner_id,
            purchase_request_id: None,
            created_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(buyer_id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.created");
        }

        let (subject, body) = contract_opened(&contract);
        self.mailer.send_to_parties(&contract, &subject, body).await;

        Ok(CreateContractResult { contract, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        buyer, email_of, listing_id, seller, Fixture, BATTERY, BUYER, SELLER, VEHICLE,
    };
    use crate::domain::contract::ContractStatus;
    use crate::domain::foundation::ErrorCode;

    fn handler(fixture: &Fixture) -> CreateContractHandler {
        CreateContractHandler::new(
            fixture.store.clone(),
            fixture.store.clone(),
            fixture.bus.clone(),
            fixture.mailer(),
        )
    }

    fn command(listing: i64) -> CreateContractCommand {
        CreateContractCommand {
            actor: buyer(),
            listing_id: listing_id(listing),
        }
    }

    #[tokio::test]
    async fn opens_pending_contract_with_listing_owner_as_seller() {
        let fixture = Fixture::new();
        let result = handler(&fixture).handle(command(VEHICLE)).await.unwrap();

        assert_eq!(result.contract.status(), ContractStatus::Pending);
        assert_eq!(result.contract.seller_id().as_i64(), SELLER);
        assert!(result.contract.purchase_request_id().is_none());
        assert!(fixture.store.contract(result.contract.id()).is_some());
    }

    #[tokio::test]
    async fn publishes_event_and_emails_both_parties() {
        let fixture = Fixture::new();
        handler(&fixture).handle(command(VEHICLE)).await.unwrap();

        assert!(fixture.bus.has_event("contract.created"));
        assert_eq!(fixture.notifier.sent_to(&email_of(BUYER)).len(), 1);
        assert_eq!(fixture.notifier.sent_to(&email_of(SELLER)).len(), 1);
    }

    #[tokio::test]
    async fn second_open_contract_conflicts() {
        let fixture = Fixture::new();
        let handler = handler(&fixture);
        handler.handle(command(VEHICLE)).await.unwrap();

        let err = handler.handle(command(VEHICLE)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContractExists);
        assert_eq!(fixture.store.contract_count(), 1);
    }

    #[tokio::test]
    async fn owner_cannot_buy_own_listing() {
        let fixture = Fixture::new();
        let err = handler(&fixture)
            .handle(CreateContractCommand {
                actor: seller(),
                listing_id: listing_id(VEHICLE),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn battery_listing_is_refused() {
        let fixture = Fixture::new();
        let err = handler(&fixture).handle(command(BATTERY)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(fixture.store.contract_count(), 0);
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found() {
        let fixture = Fixture::new();
        let err = handler(&fixture).handle(command(404)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ListingNotFound);
    }
}
