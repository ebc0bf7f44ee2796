//! In-memory marketplace store.
//!
//! One shared state behind a single lock implements every repository port,
//! so `accept_into_contract` is atomic just like its Postgres counterpart.
//! The uniqueness rules the database enforces with indexes are checked on
//! insert and surface as the same conflict codes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::contract::{Contract, OtpCode, Party, PurchaseRequest, PurchaseRequestStatus};
use crate::domain::foundation::{
    ContractId, DomainError, ErrorCode, ListingId, PurchaseRequestId, Timestamp, UserId, VipPlanId,
};
use crate::domain::listing::Listing;
use crate::domain::vip::{OrderCode, PurchaseStatus, VipPlan, VipPurchase};
use crate::ports::{
    ContractRepository, ContractScope, ListingRepository, PurchaseRequestRepository,
    PurchaseRequestScope, UserDirectory, UserProfile, VipPlanRepository, VipPurchaseRepository,
};

#[derive(Default)]
struct StoreState {
    contracts: HashMap<ContractId, Contract>,
    requests: HashMap<PurchaseRequestId, PurchaseRequest>,
    listings: HashMap<ListingId, Listing>,
    plans: HashMap<VipPlanId, VipPlan>,
    purchases: HashMap<String, VipPurchase>,
    users: HashMap<UserId, UserProfile>,
}

impl StoreState {
    fn active_contract_for(&self, buyer_id: UserId, listing_id: ListingId) -> Option<&Contract> {
        self.contracts.values().find(|c| {
            c.buyer_id() == buyer_id && c.listing_id() == listing_id && c.status().is_active()
        })
    }

    fn pending_request_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Option<&PurchaseRequest> {
        self.requests.values().find(|r| {
            r.buyer_id() == buyer_id
                && r.listing_id() == listing_id
                && r.status() == PurchaseRequestStatus::Pending
        })
    }

    fn pending_purchase_for(&self, user_id: UserId, listing_id: ListingId) -> Option<&VipPurchase> {
        self.purchases
            .values()
            .find(|p| p.user_id() == user_id && p.listing_id() == listing_id && p.is_pending())
    }

    fn contract_mut(&mut self, id: &ContractId) -> Result<&mut Contract, DomainError> {
        self.contracts.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::ContractNotFound, format!("Contract not found: {}", id))
                .with_detail("id", id.to_string())
        })
    }

    fn insert_contract(&mut self, contract: &Contract) -> Result<(), DomainError> {
        if self.contracts.contains_key(contract.id()) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Contract {} already exists", contract.id()),
            ));
        }
        if contract.status().is_active()
            && self
                .active_contract_for(contract.buyer_id(), contract.listing_id())
                .is_some()
        {
            return Err(DomainError::new(
                ErrorCode::ContractExists,
                "An active contract already exists for this buyer and listing",
            ));
        }
        self.contracts.insert(*contract.id(), contract.clone());
        Ok(())
    }
}

/// In-memory implementation of every repository port.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryMarketplaceStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // === Seeding ===

    pub fn add_listing(&self, listing: Listing) {
        self.write().listings.insert(listing.id, listing);
    }

    pub fn add_plan(&self, plan: VipPlan) {
        self.write().plans.insert(plan.id, plan);
    }

    pub fn add_user(&self, user: UserProfile) {
        self.write().users.insert(user.id, user);
    }

    // === Test Helpers ===

    pub fn listing(&self, id: ListingId) -> Option<Listing> {
        self.read().listings.get(&id).cloned()
    }

    pub fn contract(&self, id: &ContractId) -> Option<Contract> {
        self.read().contracts.get(id).cloned()
    }

    /// Overwrites a stored contract without the version check.
    pub fn put_contract(&self, contract: &Contract) {
        self.write().contracts.insert(*contract.id(), contract.clone());
    }

    pub fn contract_count(&self) -> usize {
        self.read().contracts.len()
    }

    pub fn purchases(&self) -> Vec<VipPurchase> {
        self.read().purchases.values().cloned().collect()
    }

    pub fn purchase_count_with_status(&self, status: PurchaseStatus) -> usize {
        self.read()
            .purchases
            .values()
            .filter(|p| p.status() == status)
            .count()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Contracts
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ContractRepository for InMemoryMarketplaceStore {
    async fn save(&self, contract: &Contract) -> Result<(), DomainError> {
        self.write().insert_contract(contract)
    }

    async fn update(&self, contract: &Contract) -> Result<(), DomainError> {
        let mut state = self.write();
        let existing = state.contract_mut(contract.id())?;
        if existing.version() != contract.version() {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Contract {} was changed by another request", contract.id()),
            )
            .with_detail("id", contract.id().to_string()));
        }
        *existing = contract.clone();
        existing.advance_version();
        Ok(())
    }

    async fn record_otp_attempt(
        &self,
        id: &ContractId,
        party: Party,
    ) -> Result<Option<u32>, DomainError> {
        Ok(self.write().contract_mut(id)?.count_otp_attempt(party))
    }

    async fn record_signature(
        &self,
        id: &ContractId,
        party: Party,
        code: &OtpCode,
        signed_at: Timestamp,
    ) -> Result<bool, DomainError> {
        Ok(self
            .write()
            .contract_mut(id)?
            .record_signature(party, code, signed_at))
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError> {
        Ok(self.read().contracts.get(id).cloned())
    }

    async fn find_active_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<Contract>, DomainError> {
        Ok(self.read().active_contract_for(buyer_id, listing_id).cloned())
    }

    async fn list(&self, scope: ContractScope) -> Result<Vec<Contract>, DomainError> {
        let state = self.read();
        let mut contracts: Vec<Contract> = state
            .contracts
            .values()
            .filter(|c| match scope {
                ContractScope::All => true,
                ContractScope::AssignedTo(staff_id) => c.staff_id() == Some(staff_id),
                ContractScope::PartyOf(user_id) => c.party_of(user_id).is_some(),
            })
            .cloned()
            .collect();
        contracts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(contracts)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Purchase requests
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl PurchaseRequestRepository for InMemoryMarketplaceStore {
    async fn save(&self, request: &PurchaseRequest) -> Result<(), DomainError> {
        let mut state = self.write();
        if request.status() == PurchaseRequestStatus::Pending
            && state
                .pending_request_for(request.buyer_id(), request.listing_id())
                .is_some()
        {
            return Err(DomainError::new(
                ErrorCode::PurchaseRequestExists,
                "A pending purchase request already exists for this listing",
            ));
        }
        state.requests.insert(*request.id(), request.clone());
        Ok(())
    }

    async fn update(&self, request: &PurchaseRequest) -> Result<(), DomainError> {
        let mut state = self.write();
        match state.requests.get_mut(request.id()) {
            Some(existing) => {
                *existing = request.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::PurchaseRequestNotFound,
                format!("Purchase request not found: {}", request.id()),
            )
            .with_detail("id", request.id().to_string())),
        }
    }

    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequest>, DomainError> {
        Ok(self.read().requests.get(id).cloned())
    }

    async fn find_pending_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<PurchaseRequest>, DomainError> {
        Ok(self.read().pending_request_for(buyer_id, listing_id).cloned())
    }

    async fn list(&self, scope: PurchaseRequestScope) -> Result<Vec<PurchaseRequest>, DomainError> {
        let state = self.read();
        let mut requests: Vec<PurchaseRequest> = state
            .requests
            .values()
            .filter(|r| match scope {
                PurchaseRequestScope::All => true,
                PurchaseRequestScope::Involving(user_id) => {
                    r.buyer_id() == user_id || r.seller_id() == user_id
                }
            })
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(requests)
    }

    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<PurchaseRequest>, DomainError> {
        Ok(self
            .read()
            .requests
            .values()
            .filter(|r| r.status() == PurchaseRequestStatus::Pending && r.is_overdue(now))
            .cloned()
            .collect())
    }

    async fn accept_into_contract(
        &self,
        request: &PurchaseRequest,
        contract: &Contract,
    ) -> Result<(), DomainError> {
        let mut state = self.write();

        let stored = state.requests.get(request.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PurchaseRequestNotFound,
                format!("Purchase request not found: {}", request.id()),
            )
            .with_detail("id", request.id().to_string())
        })?;
        if stored.status() != PurchaseRequestStatus::Pending {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "Purchase request was decided concurrently",
            ));
        }

        state.insert_contract(contract)?;
        state.requests.insert(*request.id(), request.clone());
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Listings, plans and users
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ListingRepository for InMemoryMarketplaceStore {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<Listing>, DomainError> {
        Ok(self.read().listings.get(&id).cloned())
    }

    async fn update(&self, listing: &Listing) -> Result<(), DomainError> {
        let mut state = self.write();
        match state.listings.get_mut(&listing.id) {
            Some(existing) => {
                *existing = listing.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::ListingNotFound,
                format!("Listing not found: {}", listing.id),
            )
            .with_detail("id", listing.id.to_string())),
        }
    }

    async fn list_public(&self) -> Result<Vec<Listing>, DomainError> {
        Ok(self
            .read()
            .listings
            .values()
            .filter(|l| l.is_public())
            .cloned()
            .collect())
    }

    async fn find_lapsed_vip(&self, now: Timestamp) -> Result<Vec<Listing>, DomainError> {
        Ok(self
            .read()
            .listings
            .values()
            .filter(|l| l.is_vip && !l.is_vip_effective(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VipPlanRepository for InMemoryMarketplaceStore {
    async fn find_by_id(&self, id: VipPlanId) -> Result<Option<VipPlan>, DomainError> {
        Ok(self.read().plans.get(&id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<VipPlan>, DomainError> {
        let mut plans: Vec<VipPlan> = self
            .read()
            .plans
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(plans)
    }
}

#[async_trait]
impl UserDirectory for InMemoryMarketplaceStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.read().users.get(&id).cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// VIP ledger
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl VipPurchaseRepository for InMemoryMarketplaceStore {
    async fn save(&self, purchase: &VipPurchase) -> Result<(), DomainError> {
        let mut state = self.write();
        let code = purchase.order_code().as_str();
        if state.purchases.contains_key(code) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Order code {} already exists", code),
            ));
        }
        if purchase.is_pending()
            && state
                .pending_purchase_for(purchase.user_id(), purchase.listing_id())
                .is_some()
        {
            return Err(DomainError::new(
                ErrorCode::PendingPurchaseExists,
                "A pending VIP purchase already exists for this listing",
            ));
        }
        state.purchases.insert(code.to_string(), purchase.clone());
        Ok(())
    }

    async fn update(&self, purchase: &VipPurchase) -> Result<(), DomainError> {
        let mut state = self.write();
        match state.purchases.get_mut(purchase.order_code().as_str()) {
            Some(existing) => {
                *existing = purchase.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::VipPurchaseNotFound,
                format!("VIP purchase not found: {}", purchase.order_code()),
            )
            .with_detail("id", purchase.order_code().to_string())),
        }
    }

    async fn find_by_order_code(
        &self,
        code: &OrderCode,
    ) -> Result<Option<VipPurchase>, DomainError> {
        Ok(self.read().purchases.get(code.as_str()).cloned())
    }

    async fn find_pending_for(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<VipPurchase>, DomainError> {
        Ok(self.read().pending_purchase_for(user_id, listing_id).cloned())
    }

    async fn find_paid_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<VipPurchase>, DomainError> {
        Ok(self
            .read()
            .purchases
            .values()
            .filter(|p| {
                p.status() == PurchaseStatus::Paid
                    && p.external_subscription_id() == Some(subscription_id)
            })
            .max_by_key(|p| p.paid_at())
            .cloned())
    }
}
