//! WithdrawPurchaseRequestHandler - the buyer takes a request back.

use std::sync::Arc;

use crate::domain::contract::{ContractError, PurchaseRequest};
use crate::domain::foundation::{Actor, PurchaseRequestId, Timestamp};
use crate::ports::PurchaseRequestRepository;

use super::loading::load_request;

#[derive(Debug, Clone)]
pub struct WithdrawPurchaseRequestCommand {
    pub actor: Actor,
    pub request_id: PurchaseRequestId,
}

pub struct WithdrawPurchaseRequestHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
}

impl WithdrawPurchaseRequestHandler {
    pub fn new(requests: Arc<dyn PurchaseRequestRepository>) -> Self {
        Self { requests }
    }

    pub async fn handle(
        &self,
        cmd: WithdrawPurchaseRequestCommand,
    ) -> Result<PurchaseRequest, ContractError> {
        let now = Timestamp::now();

        let mut request = load_request(self.requests.as_ref(), &cmd.request_id, now).await?;
        request.withdraw(&cmd.actor, now)?;
        self.requests.update(&request).await?;

        tracing::info!(request_id = %request.id(), "Purchase request withdrawn");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{admin, buyer, seller, Fixture};
    use crate::domain::contract::PurchaseRequestStatus;
    use crate::domain::foundation::ErrorCode;

    fn command(actor: Actor, request: &PurchaseRequest) -> WithdrawPurchaseRequestCommand {
        WithdrawPurchaseRequestCommand {
            actor,
            request_id: *request.id(),
        }
    }

    #[tokio::test]
    async fn buyer_withdraws() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;

        let withdrawn = WithdrawPurchaseRequestHandler::new(fixture.store.clone())
            .handle(command(buyer(), &request))
            .await
            .unwrap();

        assert_eq!(withdrawn.status(), PurchaseRequestStatus::Withdrawn);
        assert_eq!(
            fixture.stored_request(request.id()).await.status(),
            PurchaseRequestStatus::Withdrawn
        );
    }

    #[tokio::test]
    async fn only_the_buyer_may_withdraw() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;
        let handler = WithdrawPurchaseRequestHandler::new(fixture.store.clone());

        for actor in [seller(), admin()] {
            let err = handler.handle(command(actor, &request)).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
    }

    #[tokio::test]
    async fn expired_request_cannot_be_withdrawn() {
        let fixture = Fixture::new();
        let request = fixture.request_aged(5).await;

        let err = WithdrawPurchaseRequestHandler::new(fixture.store.clone())
            .handle(command(buyer(), &request))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert_eq!(
            fixture.stored_request(request.id()).await.status(),
            PurchaseRequestStatus::Expired
        );
    }
}
