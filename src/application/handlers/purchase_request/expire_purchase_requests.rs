//! ExpirePurchaseRequestsHandler - periodic sweep of overdue requests.

use std::sync::Arc;

use crate::domain::contract::ContractError;
use crate::domain::foundation::Timestamp;
use crate::ports::PurchaseRequestRepository;

use super::loading::expire_and_persist;

/// Marks every overdue pending request expired.
///
/// A failure on one request is logged and the sweep moves on.
pub struct ExpirePurchaseRequestsHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
}

impl ExpirePurchaseRequestsHandler {
    pub fn new(requests: Arc<dyn PurchaseRequestRepository>) -> Self {
        Self { requests }
    }

    /// Returns the number of requests expired.
    pub async fn handle(&self, now: Timestamp) -> Result<usize, ContractError> {
        let overdue = self.requests.find_overdue(now).await?;
        let mut expired = 0;

        for mut request in overdue {
            match expire_and_persist(self.requests.as_ref(), &mut request, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(request_id = %request.id(), error = %e, "Failed to expire purchase request");
                }
            }
        }

        if expired > 0 {
            tracing::info!(expired, "Purchase request sweep finished");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Fixture;
    use crate::domain::contract::PurchaseRequestStatus;

    #[tokio::test]
    async fn expires_only_overdue_pending_requests() {
        let fixture = Fixture::new();
        let overdue = fixture.request_aged(4).await;
        let handler = ExpirePurchaseRequestsHandler::new(fixture.store.clone());

        assert_eq!(handler.handle(Timestamp::now()).await.unwrap(), 1);
        assert_eq!(
            fixture.stored_request(overdue.id()).await.status(),
            PurchaseRequestStatus::Expired
        );

        // now a fresh one is allowed and stays pending
        let fresh = fixture.pending_request().await;
        assert_eq!(handler.handle(Timestamp::now()).await.unwrap(), 0);
        assert_eq!(
            fixture.stored_request(fresh.id()).await.status(),
            PurchaseRequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let fixture = Fixture::new();
        fixture.request_aged(7).await;
        let handler = ExpirePurchaseRequestsHandler::new(fixture.store.clone());

        assert_eq!(handler.handle(Timestamp::now()).await.unwrap(), 1);
        assert_eq!(handler.handle(Timestamp::now()).await.unwrap(), 0);
    }
}
