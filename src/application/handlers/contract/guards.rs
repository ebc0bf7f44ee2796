//! Loading and precondition helpers shared by contract and purchase request handlers.

use crate::domain::contract::{Contract, ContractError};
use crate::domain::foundation::{ContractId, ErrorCode, ListingId, UserId};
use crate::domain::listing::Listing;
use crate::ports::{ContractRepository, ListingRepository};

pub(crate) async fn load_contract(
    repository: &dyn ContractRepository,
    id: &ContractId,
) -> Result<Contract, ContractError> {
    repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ContractError::not_found("contract", id))
}

pub(crate) async fn load_listing(
    listings: &dyn ListingRepository,
    id: ListingId,
) -> Result<Listing, ContractError> {
    listings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ContractError::not_found("listing", id))
}

/// Checks that a buyer may open a sale on this listing.
///
/// # Errors
///
/// - `ValidationFailed` for the owner's own listing or a battery listing
/// - `InvalidState` if the listing is already sold
pub(crate) fn ensure_listing_purchasable(listing: &Listing, buyer_id: UserId) -> Result<(), ContractError> {
    if listing.owner_id == buyer_id {
        return Err(ContractError::validation(
            "listing_id",
            "You cannot buy your own listing",
        ));
    }
    if listing.is_battery() {
        return Err(ContractError::validation(
            "listing_id",
            "Battery listings are sold without a mediated contract",
        ));
    }
    if listing.is_sold() {
        return Err(ContractError::invalid_state("This listing has already been sold"));
    }
    Ok(())
}

/// # Errors
///
/// - `Conflict` (`ContractExists`) if the buyer already has an open contract
pub(crate) async fn ensure_no_active_contract(
    contracts: &dyn ContractRepository,
    buyer_id: UserId,
    listing_id: ListingId,
) -> Result<(), ContractError> {
    match contracts.find_active_for(buyer_id, listing_id).await? {
        Some(existing) => Err(ContractError::conflict(
            ErrorCode::ContractExists,
            format!(
                "Contract {} is already open for this listing",
                existing.id()
            ),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{listing_id, user, Fixture, BATTERY, BUYER, SELLER, VEHICLE};
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn own_listing_is_rejected() {
        let fixture = Fixture::new();
        let listing = load_listing(fixture.store.as_ref(), listing_id(VEHICLE)).await.unwrap();

        let err = ensure_listing_purchasable(&listing, user(SELLER)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn battery_listing_is_rejected() {
        let fixture = Fixture::new();
        let listing = load_listing(fixture.store.as_ref(), listing_id(BATTERY)).await.unwrap();

        assert!(ensure_listing_purchasable(&listing, user(BUYER)).is_err());
    }

    #[tokio::test]
    async fn sold_listing_is_invalid_state() {
        let fixture = Fixture::new();
        let mut listing = load_listing(fixture.store.as_ref(), listing_id(VEHICLE)).await.unwrap();
        listing.mark_sold(Timestamp::now());

        let err = ensure_listing_purchasable(&listing, user(BUYER)).unwrap_err();
        assert!(matches!(err, ContractError::InvalidState(_)));
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let fixture = Fixture::new();
        let err = load_listing(fixture.store.as_ref(), listing_id(555)).await.unwrap_err();
        assert_eq!(err, ContractError::not_found("listing", 555));
    }
}
