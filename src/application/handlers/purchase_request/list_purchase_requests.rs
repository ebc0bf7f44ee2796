//! ListPurchaseRequestsHandler - Query handler for the requests an actor can see.

use std::sync::Arc;

use crate::domain::contract::{ContractError, PurchaseRequest};
use crate::domain::foundation::{Actor, Timestamp};
use crate::ports::{PurchaseRequestRepository, PurchaseRequestScope};

use super::loading::expire_and_persist;

#[derive(Debug, Clone)]
pub struct ListPurchaseRequestsQuery {
    pub actor: Actor,
}

/// Back office sees everything; customers see requests they sent or received.
///
/// Overdue entries are expired on the way out.
pub struct ListPurchaseRequestsHandler {
    requests: Arc<dyn PurchaseRequestRepository>,
}

impl ListPurchaseRequestsHandler {
    pub fn new(requests: Arc<dyn PurchaseRequestRepository>) -> Self {
        Self { requests }
    }

    pub async fn handle(
        &self,
        query: ListPurchaseRequestsQuery,
    ) -> Result<Vec<PurchaseRequest>, ContractError> {
        let scope = if query.actor.is_back_office() {
            PurchaseRequestScope::All
        } else {
            PurchaseRequestScope::Involving(query.actor.id)
        };

        let now = Timestamp::now();
        let mut requests = self.requests.list(scope).await?;
        for request in requests.iter_mut() {
            expire_and_persist(self.requests.as_ref(), request, now).await?;
        }
        Ok(requests)
    }
}
