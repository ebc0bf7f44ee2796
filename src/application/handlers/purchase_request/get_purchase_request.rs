//! GetPurchaseRequestHandler - Query handler for a single request.

use std::sync::Arc;

use crate::domain::contract::{ContractError, PurchaseRequest};
use crate::domain::foundation::{Actor, PurchaseRequestId, Timestamp};
use crate::ports::PurchaseRequestRepository;

use super::loading::load_request;

#[derive(Debug, Clone)]
pub struct GetPurchaseRequestQuery {
    pub actor: Actor,
    pub request_id: PurchaseRequestId,
}

/// Buyer, seller, staff or admin.
pub struct GetPurchaseRequestHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
}

impl GetPurchaseRequestHandler {
    pub fn new(requests: Arc<dyn PurchaseRequestRepository>) -> Self {
        Self { requests }
    }

    pub async fn handle(&self, query: GetPurchaseRequestQuery) -> Result<PurchaseRequest, ContractError> {
        let request = load_request(self.requests.as_ref(), &query.request_id, Timestamp::now()).await?;
        request.authorize_view(&query.actor)?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        admin, buyer, seller, staff, stranger, Fixture,
    };
    use crate::domain::contract::PurchaseRequestStatus;
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn participants_and_back_office_can_view() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;
        let handler = GetPurchaseRequestHandler::new(fixture.store.clone());

        for actor in [buyer(), seller(), staff(), admin()] {
            let found = handler
                .handle(GetPurchaseRequestQuery {
                    actor,
                    request_id: *request.id(),
                })
                .await
                .unwrap();
            assert_eq!(found.id(), request.id());
        }
    }

    #[tokio::test]
    async fn strangers_are_forbidden() {
        let fixture = Fixture::new();
        let request = fixture.pending_request().await;

        let err = GetPurchaseRequestHandler::new(fixture.store.clone())
            .handle(GetPurchaseRequestQuery {
                actor: stranger(),
                request_id: *request.id(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn reading_an_overdue_request_expires_it() {
        let fixture = Fixture::new();
        let request = fixture.request_aged(3).await;

        let found = GetPurchaseRequestHandler::new(fixture.store.clone())
            .handle(GetPurchaseRequestQuery {
                actor: buyer(),
                request_id: *request.id(),
            })
            .await
            .unwrap();

        assert_eq!(found.status(), PurchaseRequestStatus::Expired);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let fixture = Fixture::new();
        let err = GetPurchaseRequestHandler::new(fixture.store.clone())
            .handle(GetPurchaseRequestQuery {
                actor: admin(),
                request_id: PurchaseRequestId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PurchaseRequestNotFound);
    }
}
