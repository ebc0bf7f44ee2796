//! Serializable projection of a contract.
//!
//! This is the only shape in which a contract leaves the service. It reports
//! whether a signing code is outstanding, never the code itself.

use serde::Serialize;

use crate::domain::foundation::{ContractId, ListingId, PurchaseRequestId, Timestamp, UserId};

use super::{Contract, ContractStatus, FeeResponsibility, FeeSchedule, Party};

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub scheduled_at: Timestamp,
    pub place: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartySigningView {
    pub user_id: UserId,
    pub signed_at: Option<Timestamp>,
    pub otp_pending: bool,
    pub otp_expires_at: Option<Timestamp>,
    pub otp_attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    pub id: ContractId,
    pub purchase_request_id: Option<PurchaseRequestId>,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub staff_id: Option<UserId>,
    pub status: ContractStatus,
    pub agreed_price: Option<i64>,
    pub fees: FeeSchedule,
    pub fee_responsibility: FeeResponsibility,
    pub total_fees: i64,
    pub appointment: Option<AppointmentView>,
    pub buyer: PartySigningView,
    pub seller: PartySigningView,
    pub signed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancel_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Contract> for ContractView {
    fn from(contract: &Contract) -> Self {
        let party = |party: Party| {
            let signing = contract.signing(party);
            PartySigningView {
                user_id: contract.party_user(party),
                signed_at: signing.signed_at(),
                otp_pending: signing.has_pending_code(),
                otp_expires_at: signing.challenge().map(|c| c.expires_at()),
                otp_attempts: signing.attempts(),
            }
        };
        let terms = contract.terms();
        let fees = terms.map(|t| t.fees.clone()).unwrap_or_default();

        Self {
            id: *contract.id(),
            purchase_request_id: contract.purchase_request_id().copied(),
            listing_id: contract.listing_id(),
            buyer_id: contract.buyer_id(),
            seller_id: contract.seller_id(),
            staff_id: contract.staff_id(),
            status: contract.status(),
            agreed_price: terms.map(|t| t.agreed_price),
            total_fees: fees.total(),
            fees,
            fee_responsibility: terms.map(|t| t.responsibility.clone()).unwrap_or_default(),
            appointment: contract.appointment().map(|a| AppointmentView {
                scheduled_at: a.scheduled_at,
                place: a.place.clone(),
                note: a.note.clone(),
            }),
            buyer: party(Party::Buyer),
            seller: party(Party::Seller),
            signed_at: contract.signed_at(),
            completed_at: contract.completed_at(),
            cancelled_at: contract.cancelled_at(),
            cancel_reason: contract.cancel_reason().map(str::to_string),
            created_at: contract.created_at(),
            updated_at: contract.updated_at(),
        }
    }
}
