//! Contract domain events.
//!
//! Published after the contract has been persisted:
//! - `ContractCreated` - contract opened (directly or from a purchase request)
//! - `StaffAssigned` - mediating staff assigned or replaced
//! - `TermsFinalized` - price and fees fixed, signing opened
//! - `ContractSigned` - both parties signed; the listing is now sold
//! - `ContractCompleted` - transaction closed
//! - `ContractCancelled` - contract abandoned

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, ContractId, EventId, ListingId, PurchaseRequestId, Timestamp, UserId,
};

/// Event type of `ContractSigned`, used for subscriptions.
pub const CONTRACT_SIGNED_EVENT: &str = "contract.signed";

// ════════════════════════════════════════════════════════════════════════════
// ContractCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a contract is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCreated {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,

    /// Set when the contract came from an accepted purchase request.
    pub purchase_request_id: Option<PurchaseRequestId>,

    pub created_at: Timestamp,
}

domain_event!(
    ContractCreated,
    event_type = "contract.created",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// StaffAssigned
// ════════════════════════════════════════════════════════════════════════════

/// Published when an admin assigns or replaces the contract's staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAssigned {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub staff_id: UserId,
    pub previous_staff_id: Option<UserId>,
    pub assigned_by: UserId,
    pub assigned_at: Timestamp,
}

domain_event!(
    StaffAssigned,
    event_type = "contract.staff_assigned",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = assigned_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// TermsFinalized
// ════════════════════════════════════════════════════════════════════════════

/// Published when staff fix the agreed price and fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsFinalized {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub agreed_price: i64,
    pub total_fees: i64,
    pub finalized_by: UserId,
    pub finalized_at: Timestamp,
}

domain_event!(
    TermsFinalized,
    event_type = "contract.terms_finalized",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = finalized_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ContractSigned
// ════════════════════════════════════════════════════════════════════════════

/// Published once both parties have signed.
///
/// Subscribers mark the listing sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSigned {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub signed_at: Timestamp,
}

domain_event!(
    ContractSigned,
    event_type = "contract.signed",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = signed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ContractCompleted
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCompleted {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub listing_id: ListingId,
    pub completed_by: UserId,
    pub completed_at: Timestamp,
}

domain_event!(
    ContractCompleted,
    event_type = "contract.completed",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = completed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ContractCancelled
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCancelled {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub cancelled_by: UserId,
    pub reason: String,
    pub cancelled_at: Timestamp,
}

domain_event!(
    ContractCancelled,
    event_type = "contract.cancelled",
    aggregate_id = contract_id,
    aggregate_type = "Contract",
    occurred_at = cancelled_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn contract_signed_uses_subscribed_type() {
        let event = ContractSigned {
            event_id: EventId::new(),
            contract_id: ContractId::new(),
            listing_id: ListingId::new(3).unwrap(),
            buyer_id: UserId::new(1).unwrap(),
            seller_id: UserId::new(2).unwrap(),
            signed_at: Timestamp::now(),
        };
        assert_eq!(event.event_type(), CONTRACT_SIGNED_EVENT);

        let envelope = event.to_envelope();
        assert_eq!(envelope.aggregate_type, "Contract");
        let back: ContractSigned = envelope.payload_as().unwrap();
        assert_eq!(back.listing_id, event.listing_id);
    }

    #[test]
    fn cancelled_event_carries_reason() {
        let event = ContractCancelled {
            event_id: EventId::new(),
            contract_id: ContractId::new(),
            cancelled_by: UserId::new(4).unwrap(),
            reason: "Financing fell through".to_string(),
            cancelled_at: Timestamp::now(),
        };
        let envelope = event.to_envelope();
        assert_eq!(envelope.payload["reason"], "Financing fell through");
    }
}
