//! Listing repository port.
//!
//! Listings are owned by the CRUD layer; this port only reads them and
//! writes back sale and VIP state.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ListingId, Timestamp};
use crate::domain::listing::Listing;

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<Listing>, DomainError>;

    /// Persist sale, visibility and VIP fields.
    ///
    /// # Errors
    ///
    /// - `ListingNotFound` if the listing doesn't exist
    async fn update(&self, listing: &Listing) -> Result<(), DomainError>;

    /// Active, unsold listings in no particular order.
    async fn list_public(&self) -> Result<Vec<Listing>, DomainError>;

    /// Listings flagged VIP whose expiry is at or before `now`.
    async fn find_lapsed_vip(&self, now: Timestamp) -> Result<Vec<Listing>, DomainError>;
}
