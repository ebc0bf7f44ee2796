//! Contract repository port.

use async_trait::async_trait;

use crate::domain::contract::{Contract, OtpCode, Party};
use crate::domain::foundation::{ContractId, DomainError, ListingId, Timestamp, UserId};

/// Which contracts a listing query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractScope {
    /// Every contract (admins).
    All,
    /// Contracts assigned to a staff member.
    AssignedTo(UserId),
    /// Contracts where the user is buyer or seller.
    PartyOf(UserId),
}

/// Repository port for Contract aggregate persistence.
///
/// Implementations must enforce at most one active contract per buyer and
/// listing, reporting a violation as `ContractExists`.
///
/// Signing goes through `record_otp_attempt` and `record_signature`, which
/// touch only one party's columns and are atomic in storage. Buyer and
/// seller may sign at the same moment without losing each other's writes.
#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// Save a new contract.
    ///
    /// # Errors
    ///
    /// - `ContractExists` if the buyer already has an active contract for the listing
    /// - `DatabaseError` on persistence failure
    async fn save(&self, contract: &Contract) -> Result<(), DomainError>;

    /// Update an existing contract if nothing was stored since it was loaded.
    ///
    /// # Errors
    ///
    /// - `ContractNotFound` if the contract doesn't exist
    /// - `Conflict` if the stored version differs from `contract.version()`
    /// - `DatabaseError` on persistence failure
    async fn update(&self, contract: &Contract) -> Result<(), DomainError>;

    /// Counts one code submission for a party, atomically.
    ///
    /// Returns the counter after the increment, or `None` when the party has
    /// no outstanding code, has already signed, or the contract is no longer
    /// awaiting signatures.
    async fn record_otp_attempt(
        &self,
        id: &ContractId,
        party: Party,
    ) -> Result<Option<u32>, DomainError>;

    /// Stores a party's signature and clears its code, only if `code` is
    /// still the party's outstanding code. The other party's columns are
    /// left untouched.
    ///
    /// Returns false when the guard did not match.
    async fn record_signature(
        &self,
        id: &ContractId,
        party: Party,
        code: &OtpCode,
        signed_at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Find a contract by ID.
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError>;

    /// Find the buyer's non-terminal contract for a listing, if any.
    async fn find_active_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<Contract>, DomainError>;

    /// List contracts, newest first.
    async fn list(&self, scope: ContractScope) -> Result<Vec<Contract>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ContractRepository) {}
    }
}
