//! AcceptPurchaseRequestHandler - turns a pending request into a contract.

use std::sync::Arc;

use crate::application::handlers::contract::guards::{
    ensure_listing_purchasable, ensure_no_active_contract, load_listing,
};
use crate::application::handlers::contract::{contract_opened, ContractMailer};
use crate::domain::contract::{Contract, ContractCreated, ContractError, PurchaseRequest};
use crate::domain::foundation::{
    Actor, ContractId, EventEnvelope, EventId, PurchaseRequestId, Timestamp,
};
use crate::ports::{ContractRepository, EventPublisher, ListingRepository, PurchaseRequestRepository};

use super::loading::load_request;

#[derive(Debug, Clone)]
pub struct AcceptPurchaseRequestCommand {
    pub actor: Actor,
    pub request_id: PurchaseRequestId,
}

#[derive(Debug, Clone)]
pub struct AcceptPurchaseRequestResult {
    pub request: PurchaseRequest,
    pub contract: Contract,
}

/// Seller, staff or admin accepts; the request and its contract are
/// stored together.
pub struct AcceptPurchaseRequestHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
    contracts: Arc<dyn ContractRepository>,
    listings: Arc<dyn ListingRepository>,
    publisher: Arc<dyn EventPublisher>,
    mailer: Arc<ContractMailer>,
}

impl AcceptPurchaseRequestHandler {
    pub fn new(
        requests: Arc<dyn PurchaseRequestRepository>,
        contracts: Arc<dyn ContractRepository>,
        listings: Arc<dyn ListingRepository>,
        publisher: Arc<dyn EventPublisher>,
        mailer: Arc<ContractMailer>,
    ) -> Self {
        Self {
            requests,
            contracts,
            listings,
            publisher,
            mailer,
        }
    }

    pub async fn handle(
        &self,
        cmd: AcceptPurchaseRequestCommand,
    ) -> Result<AcceptPurchaseRequestResult, ContractError> {
        let now = Timestamp::now();

        // 1. Load (expiring if overdue), authorize and transition
        let mut request = load_request(self.requests.as_ref(), &cmd.request_id, now).await?;
        request.authorize_decision(&cmd.actor)?;
        let contract_id = ContractId::new();
        request.accept(cmd.actor.id, contract_id, now)?;

        // 2. The listing must still be purchasable by this buyer
        let listing = load_listing(self.listings.as_ref(), request.listing_id()).await?;
        ensure_listing_purchasable(&listing, request.buyer_id())?;
        ensure_no_active_contract(self.contracts.as_ref(), request.buyer_id(), listing.id).await?;

        // 3. The contract that answers the request
        let contract = Contract::create(
            contract_id,
            request.listing_id(),
            request.buyer_id(),
            request.seller_id(),
            Some(*request.id()),
            now,
        )?;

        // 4. One transaction
        self.requests.accept_into_contract(&request, &contract).await?;

        tracing::info!(
            request_id = %request.id(),
            contract_id = %contract.id(),
            handled_by = %cmd.actor.id,
            "Purchase request accepted"
        );

        // 5. Post-commit: event and emails
        let event = ContractCreated {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            listing_id: contract.listing_id(),
            buyer_id: contract.buyer_id(),
            seller_id: contract.seller_id(),
            purchase_request_id: Some(*request.id()),
            created_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(cmd.actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.created");
        }

        let (subject, body) = contract_opened(&contract);
        self.mailer.send_to_parties(&contract, &subject, body).await;

        Ok(AcceptPurchaseRequestResult { request, contract })
    }
}
