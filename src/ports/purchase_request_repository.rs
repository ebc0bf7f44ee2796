//! Purchase request repository port.

use async_trait::async_trait;

use crate::domain::contract::{Contract, PurchaseRequest};
use crate::domain::foundation::{DomainError, ListingId, PurchaseRequestId, Timestamp, UserId};

/// Which requests a listing query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRequestScope {
    /// Every request (admins and staff).
    All,
    /// Requests where the user is buyer or seller.
    Involving(UserId),
}

#[async_trait]
pub trait PurchaseRequestRepository: Send + Sync {
    /// Save a new request.
    ///
    /// # Errors
    ///
    /// - `PurchaseRequestExists` if a pending request exists for buyer and listing
    /// - `DatabaseError` on persistence failure
    async fn save(&self, request: &PurchaseRequest) -> Result<(), DomainError>;

    /// Update an existing request.
    async fn update(&self, request: &PurchaseRequest) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PurchaseRequestId)
        -> Result<Option<PurchaseRequest>, DomainError>;

    /// Find the buyer's pending request for a listing, if any.
    async fn find_pending_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<PurchaseRequest>, DomainError>;

    /// List requests, newest first.
    async fn list(&self, scope: PurchaseRequestScope) -> Result<Vec<PurchaseRequest>, DomainError>;

    /// Pending requests whose deadline is at or before `now`.
    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<PurchaseRequest>, DomainError>;

    /// Stores the accepted request and its new contract in one transaction.
    ///
    /// Either both writes land or neither does.
    ///
    /// # Errors
    ///
    /// - `ContractExists` if an active contract appeared concurrently
    /// - `DatabaseError` on persistence failure
    async fn accept_into_contract(
        &self,
        request: &PurchaseRequest,
        contract: &Contract,
    ) -> Result<(), DomainError>;
}
