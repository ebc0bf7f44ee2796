//! RejectPurchaseRequestHandler - Command handler for declining a request.

use std::sync::Arc;

use crate::application::handlers::contract::{purchase_request_rejected, ContractMailer};
use crate::domain::contract::{ContractError, PurchaseRequest};
use crate::domain::foundation::{Actor, PurchaseRequestId, Timestamp};
use crate::ports::PurchaseRequestRepository;

use super::loading::load_request;

#[derive(Debug, Clone)]
pub struct RejectPurchaseRequestCommand {
    pub actor: Actor,
    pub request_id: PurchaseRequestId,
    pub reason: String,
}

pub struct RejectPurchaseRequestHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
    mailer: Arc<ContractMailer>,
}

impl RejectPurchaseRequestHandler {
    pub fn new(requests: Arc<dyn PurchaseRequestRepository>, mailer: Arc<ContractMailer>) -> Self {
        Self { requests, mailer }
    }

    pub async fn handle(
        &self,
        cmd: RejectPurchaseRequestCommand,
    ) -> Result<PurchaseRequest, ContractError> {
        let now = Timestamp::now();

        let mut request = load_request(self.requests.as_ref(), &cmd.request_id, now).await?;
        request.authorize_decision(&cmd.actor)?;
        request.reject(cmd.actor.id, &cmd.reason, now)?;
        self.requests.update(&request).await?;

        tracing::info!(
            request_id = %request.id(),
            handled_by = %cmd.actor.id,
            "Purchase request rejected"
        );

        let (subject, body) = purchase_request_rejected(&request);
        self.mailer.send_to(request.buyer_id(), &subject, body).await;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{buyer, email_of, seller, staff, Fixture, BUYER};
    use crate::domain::contract::PurchaseRequestStatus;
    use crate::domain::foundation::ErrorCode;

    fn handler(fixture: &Fixture) -> RejectPurchaseRequestHandler {
        RejectPurchaseRequestHandler::new(fixture.store.clone(), fixture.mailer())
    }

    fn command(actor: Actor, request: &PurchaseRequest, reason: &str) -> RejectPurchaseRequestCommand {
        RejectPurchaseRequestCommand {
            actor,
            request_id: *request.id(),
            reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn seller_rejects_with_reason() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;

        let rejected = handler(&fixture)
            .handle(command(seller(), &request, "Already sold offline"))
            .await
            .unwrap();

        assert_eq!(rejected.status(), PurchaseRequestStatus::Rejected);
        assert_eq!(rejected.reject_reason(), Some("Already sold offline"));
        assert_eq!(fixture.store.contract_count(), 0);
        assert_eq!(fixture.notifier.sent_to(&email_of(BUYER)).len(), 1);
    }

    #[tokio::test]
    async fn blank_reason_is_refused() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;

        let err = handler(&fixture).handle(command(staff(), &request, "  ")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(
            fixture.stored_request(request.id()).await.status(),
            PurchaseRequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn buyer_cannot_reject() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;

        let err = handler(&fixture).handle(command(buyer(), &request, "no")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn rejection_is_terminal() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;
        let handler = handler(&fixture);
        handler.handle(command(seller(), &request, "Price")).await.unwrap();

        let err = handler.handle(command(seller(), &request, "Again")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }
}
