//! VIP purchase ledger port.
//!
//! Rows are keyed by order code. Implementations must enforce a unique order
//! code and at most one `PENDING` row per user and listing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ListingId, UserId};
use crate::domain::vip::{OrderCode, VipPurchase};

#[async_trait]
pub trait VipPurchaseRepository: Send + Sync {
    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// - `PendingPurchaseExists` if the user already has a pending row for the listing
    /// - `Conflict` on a duplicate order code
    async fn save(&self, purchase: &VipPurchase) -> Result<(), DomainError>;

    /// Update an existing row.
    ///
    /// # Errors
    ///
    /// - `VipPurchaseNotFound` if the row doesn't exist
    async fn update(&self, purchase: &VipPurchase) -> Result<(), DomainError>;

    async fn find_by_order_code(&self, code: &OrderCode)
        -> Result<Option<VipPurchase>, DomainError>;

    /// The user's pending row for a listing, if any.
    async fn find_pending_for(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<VipPurchase>, DomainError>;

    /// The most recent paid row carrying this gateway subscription id.
    async fn find_paid_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<VipPurchase>, DomainError>;
}
