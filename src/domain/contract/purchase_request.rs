//! Purchase request aggregate.
//!
//! A buyer asks to purchase a listing; the seller (or back office) accepts,
//! which opens a contract, or rejects. Requests carry a deadline and lapse
//! to `Expired` when it passes, either on first access or in a sweep.

use crate::domain::foundation::{
    Actor, ContractId, DomainError, ErrorCode, ListingId, PurchaseRequestId, StateMachine,
    Timestamp, UserId,
};

use super::PurchaseRequestStatus;

/// Days a request stays open unless configured otherwise.
pub const DEFAULT_REQUEST_TTL_DAYS: i64 = 3;

/// Maximum length of the buyer's message.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    id: PurchaseRequestId,
    buyer_id: UserId,
    seller_id: UserId,
    listing_id: ListingId,
    message: Option<String>,
    status: PurchaseRequestStatus,
    handled_by: Option<UserId>,
    reject_reason: Option<String>,
    contract_id: Option<ContractId>,
    expires_at: Timestamp,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl PurchaseRequest {
    /// # Errors
    ///
    /// - `ValidationFailed` if buyer and seller are the same user
    /// - `ValidationFailed` if the message is too long
    pub fn new(
        id: PurchaseRequestId,
        buyer_id: UserId,
        seller_id: UserId,
        listing_id: ListingId,
        message: Option<String>,
        ttl_days: i64,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if buyer_id == seller_id {
            return Err(DomainError::validation(
                "listing_id",
                "You cannot request to buy your own listing",
            ));
        }
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if message.as_ref().is_some_and(|m| m.chars().count() > MAX_MESSAGE_LENGTH) {
            return Err(DomainError::validation(
                "message",
                format!("Message cannot exceed {} characters", MAX_MESSAGE_LENGTH),
            ));
        }

        Ok(Self {
            id,
            buyer_id,
            seller_id,
            listing_id,
            message,
            status: PurchaseRequestStatus::Pending,
            handled_by: None,
            reject_reason: None,
            contract_id: None,
            expires_at: now.add_days(ttl_days),
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a request from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: PurchaseRequestId,
        buyer_id: UserId,
        seller_id: UserId,
        listing_id: ListingId,
        message: Option<String>,
        status: PurchaseRequestStatus,
        handled_by: Option<UserId>,
        reject_reason: Option<String>,
        contract_id: Option<ContractId>,
        expires_at: Timestamp,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            buyer_id,
            seller_id,
            listing_id,
            message,
            status,
            handled_by,
            reject_reason,
            contract_id,
            expires_at,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &PurchaseRequestId {
        &self.id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status(&self) -> PurchaseRequestStatus {
        self.status
    }

    pub fn handled_by(&self) -> Option<UserId> {
        self.handled_by
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    pub fn contract_id(&self) -> Option<&ContractId> {
        self.contract_id.as_ref()
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Pending and past its deadline, but not yet marked expired.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status == PurchaseRequestStatus::Pending && !now.is_before(&self.expires_at)
    }

    /// Pending and still within its deadline.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.status == PurchaseRequestStatus::Pending && !self.is_overdue(now)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    pub fn can_view(&self, actor: &Actor) -> bool {
        actor.is_back_office() || actor.id == self.buyer_id || actor.id == self.seller_id
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the actor may read this request
    pub fn authorize_view(&self, actor: &Actor) -> Result<(), DomainError> {
        if self.can_view(actor) {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                "You are not involved in this purchase request",
            ))
        }
    }

    /// Seller, staff and admins decide on a request.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for anyone else
    pub fn authorize_decision(&self, actor: &Actor) -> Result<(), DomainError> {
        if actor.is_back_office() || actor.id == self.seller_id {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                "Only the seller or marketplace staff may decide on this request",
            ))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks an overdue request expired. Returns true if it changed.
    pub fn expire_if_overdue(&mut self, now: Timestamp) -> bool {
        if !self.is_overdue(now) {
            return false;
        }
        self.status = PurchaseRequestStatus::Expired;
        self.updated_at = now;
        true
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless pending and within the deadline
    pub fn accept(
        &mut self,
        handled_by: UserId,
        contract_id: ContractId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_open(now, "accept")?;
        self.transition_to(PurchaseRequestStatus::Accepted)?;
        self.handled_by = Some(handled_by);
        self.contract_id = Some(contract_id);
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `ValidationFailed` if the reason is blank
    /// - `InvalidStateTransition` unless pending and within the deadline
    pub fn reject(
        &mut self,
        handled_by: UserId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason", "A rejection reason is required"));
        }
        self.ensure_open(now, "reject")?;
        self.transition_to(PurchaseRequestStatus::Rejected)?;
        self.handled_by = Some(handled_by);
        self.reject_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the actor is the buyer
    /// - `InvalidStateTransition` unless pending
    pub fn withdraw(&mut self, actor: &Actor, now: Timestamp) -> Result<(), DomainError> {
        if actor.id != self.buyer_id {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Only the buyer may withdraw this request",
            ));
        }
        self.ensure_open(now, "withdraw")?;
        self.transition_to(PurchaseRequestStatus::Withdrawn)?;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_open(&self, now: Timestamp, action: &str) -> Result<(), DomainError> {
        if self.is_overdue(now) || self.status == PurchaseRequestStatus::Expired {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "This purchase request has expired",
            ));
        }
        if self.status != PurchaseRequestStatus::Pending {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot {} a purchase request that is {}", action, self.status),
            ));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: PurchaseRequestStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move purchase request from {} to {}", self.status, target),
            )
        })?;
        Ok(())
    }
}
